//! Configuration loading and management

mod io;
mod settings;

pub use io::write_config;
pub use settings::{AuthSettings, LlmProvider, LlmSettings, ProbeSettings, Settings};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Generative backend
    #[serde(default)]
    pub llm: LlmSettings,

    /// Synthesis, remediation and load parameters
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Login credentials for probes
    #[serde(default)]
    pub auth: AuthSettings,
}

impl Config {
    /// Create a config with built-in defaults
    pub fn with_defaults() -> Self {
        Self::default()
    }
}
