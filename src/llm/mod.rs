//! Generative backend boundary
//!
//! The backend is an opaque text-completion service: a prompt plus an optional
//! system instruction in, completed text out. Calls are bounded by the
//! configured timeout (120s by default) and never retried here; retries
//! belong to the remediation loop.

mod client;

pub use client::{AnthropicBackend, OllamaBackend};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{LlmProvider, LlmSettings};

/// The backend could not produce a completion
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("Generative backend disabled")]
    Disabled,

    #[error("Generative backend unavailable: {0}")]
    Unavailable(String),

    #[error("Generative backend timed out after {0}s")]
    Timeout(u64),

    #[error("Generative backend returned an empty completion")]
    EmptyResponse,
}

/// A text-completion service
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt`, optionally steered by a system instruction
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, GenerationError>;

    /// Backend identifier for logs
    fn id(&self) -> &str;
}

/// Backend used when generation is switched off; every call fails
#[derive(Debug, Clone, Default)]
pub struct DisabledBackend;

#[async_trait]
impl CompletionBackend for DisabledBackend {
    async fn complete(&self, _prompt: &str, _system: Option<&str>) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }

    fn id(&self) -> &str {
        "disabled"
    }
}

/// Build the configured backend
///
/// A provider that needs an API key falls back to [`DisabledBackend`] when the
/// key is not set.
pub fn backend_from_settings(settings: &LlmSettings) -> Arc<dyn CompletionBackend> {
    match settings.provider {
        LlmProvider::Disabled => Arc::new(DisabledBackend),
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(settings)),
        LlmProvider::Anthropic => match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Arc::new(AnthropicBackend::new(settings, key)),
            _ => {
                tracing::warn!(
                    "{} is not set; generative rewrites disabled, using templates",
                    settings.api_key_env
                );
                Arc::new(DisabledBackend)
            }
        },
    }
}

/// Extract code from a completion, dropping markdown fences and chatter
///
/// With fences present the first fenced block wins; otherwise the trimmed
/// text is returned as-is.
pub fn extract_code(completion: &str) -> String {
    let Some(start) = completion.find("```") else {
        return completion.trim().to_string();
    };
    let after = &completion[start + 3..];
    // Skip the language tag line
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    body[..end].trim().to_string()
}
