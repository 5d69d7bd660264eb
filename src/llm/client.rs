//! HTTP completion clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionBackend, GenerationError};
use crate::config::LlmSettings;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OLLAMA_API_URL: &str = "http://127.0.0.1:11434/api/generate";

fn build_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

fn map_ureq_error(e: ureq::Error, timeout_secs: u64) -> GenerationError {
    match e {
        ureq::Error::Status(code, response) => {
            let text = response.into_string().unwrap_or_default();
            GenerationError::Unavailable(format!("status {}: {}", code, text))
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            if message.contains("timed out") {
                GenerationError::Timeout(timeout_secs)
            } else {
                GenerationError::Unavailable(message)
            }
        }
    }
}

/// Run a blocking request off the async runtime
async fn blocking<T, F>(f: F) -> Result<T, GenerationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GenerationError::Unavailable(format!("backend task aborted: {}", e)))?
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Anthropic messages API client
#[derive(Clone)]
pub struct AnthropicBackend {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    timeout_secs: u64,
}

impl AnthropicBackend {
    pub fn new(settings: &LlmSettings, api_key: String) -> Self {
        Self {
            agent: build_agent(settings.timeout_secs),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: settings.model.clone(),
            api_key,
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
        }
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, GenerationError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: system.map(str::to_string),
        };
        let this = self.clone();

        blocking(move || {
            let response: MessagesResponse = this
                .agent
                .post(&this.endpoint)
                .set("x-api-key", &this.api_key)
                .set("anthropic-version", ANTHROPIC_VERSION)
                .send_json(&request)
                .map_err(|e| map_ureq_error(e, this.timeout_secs))?
                .into_json()
                .map_err(|e| GenerationError::Unavailable(format!("bad response: {}", e)))?;

            let text: String = response
                .content
                .into_iter()
                .map(|block| block.text)
                .collect::<Vec<_>>()
                .join("");
            if text.trim().is_empty() {
                return Err(GenerationError::EmptyResponse);
            }
            Ok(text)
        })
        .await
    }

    fn id(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama generate API client
#[derive(Clone)]
pub struct OllamaBackend {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            agent: build_agent(settings.timeout_secs),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| OLLAMA_API_URL.to_string()),
            model: settings.model.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
            stream: false,
        };
        let this = self.clone();

        blocking(move || {
            let response: GenerateResponse = this
                .agent
                .post(&this.endpoint)
                .send_json(&request)
                .map_err(|e| map_ureq_error(e, this.timeout_secs))?
                .into_json()
                .map_err(|e| GenerationError::Unavailable(format!("bad response: {}", e)))?;

            if response.response.trim().is_empty() {
                return Err(GenerationError::EmptyResponse);
            }
            Ok(response.response)
        })
        .await
    }

    fn id(&self) -> &str {
        "ollama"
    }
}
