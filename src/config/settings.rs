//! Settings configuration types

use serde::{Deserialize, Serialize};

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project, or absolute) that receives probe files
    #[serde(default = "default_generated_dir")]
    pub generated_dir: String,

    /// Glob patterns excluded from the source scan
    #[serde(default = "default_scan_exclude")]
    pub scan_exclude: Vec<String>,

    /// File extensions considered route-bearing sources
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
}

fn default_generated_dir() -> String {
    "generated-tests".to_string()
}

fn default_scan_exclude() -> Vec<String> {
    vec![
        "node_modules/**".to_string(),
        "dist/**".to_string(),
        "build/**".to_string(),
        "coverage/**".to_string(),
        "generated-tests/**".to_string(),
        "**/*.min.js".to_string(),
    ]
}

fn default_source_extensions() -> Vec<String> {
    ["js", "mjs", "cjs", "ts", "jsx", "tsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generated_dir: default_generated_dir(),
            scan_exclude: default_scan_exclude(),
            source_extensions: default_source_extensions(),
        }
    }
}

/// Generative backend provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    Ollama,
    /// No backend; templates only
    Disabled,
}

/// Generative backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,

    /// Override for the provider's default endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Probe synthesis, remediation and load settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Backend attempts per failed probe
    #[serde(default = "default_remediation_attempts")]
    pub remediation_attempts: u32,

    /// Requests per route in the performance burst
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Latency above which a request counts as over target
    #[serde(default = "default_latency_target_ms")]
    pub latency_target_ms: u64,

    /// Characters in the oversized security body
    #[serde(default = "default_oversized_payload_len")]
    pub oversized_payload_len: usize,

    /// Ask the backend to rewrite templates (false = templates only)
    #[serde(default = "default_generate")]
    pub generate: bool,
}

fn default_remediation_attempts() -> u32 {
    3
}

fn default_concurrency() -> usize {
    20
}

fn default_latency_target_ms() -> u64 {
    500
}

fn default_oversized_payload_len() -> usize {
    100_000
}

fn default_generate() -> bool {
    true
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            remediation_attempts: default_remediation_attempts(),
            concurrency: default_concurrency(),
            latency_target_ms: default_latency_target_ms(),
            oversized_payload_len: default_oversized_payload_len(),
            generate: default_generate(),
        }
    }
}

/// Credentials used for the isolated login call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_test_identity")]
    pub test_identity: String,

    #[serde(default = "default_test_password")]
    pub test_password: String,
}

fn default_test_identity() -> String {
    "test@example.com".to_string()
}

fn default_test_password() -> String {
    "password123".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            test_identity: default_test_identity(),
            test_password: default_test_password(),
        }
    }
}
