//! Live target transport
//!
//! All engines talk to the target through [`HttpTransport`], opened per stage
//! as an [`ExecutionContext`]. The default transport wraps a blocking `ureq`
//! agent and runs each request on the blocking pool, so many requests can be
//! in flight and joined from one task.

mod login;

pub use login::login;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::HttpMethod;

/// A request against the live target
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Query parameters, encoded by the transport
    pub query: Vec<(String, String)>,
    /// Raw body text; sent with a JSON content type
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A response from the live target (any status)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A single request against the target failed before a response arrived
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkProbeError {
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: HttpMethod,
        url: String,
        message: String,
    },

    #[error("request task aborted: {0}")]
    Aborted(String),
}

/// Sends requests to the live target
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, NetworkProbeError>;

    /// Called when a stage opens a context on this transport
    fn context_opened(&self, _stage: &str) {}

    /// Called when a stage's context is released
    fn context_released(&self, _stage: &str) {}
}

/// Default transport backed by a `ureq` agent
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .redirects(0)
            .build();
        Self { agent }
    }

    fn send_blocking(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpReply, NetworkProbeError> {
        let mut call = agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        for (name, value) in &request.query {
            call = call.query(name, value);
        }

        let outcome = match &request.body {
            Some(body) => call
                .set("Content-Type", "application/json")
                .send_string(body),
            None => call.call(),
        };

        let response = match outcome {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(NetworkProbeError::Transport {
                    method: request.method,
                    url: request.url.clone(),
                    message: transport.to_string(),
                });
            }
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let body = response
            .into_string()
            .map_err(|e| NetworkProbeError::Transport {
                method: request.method,
                url: request.url.clone(),
                message: format!("failed to read body: {}", e),
            })?;

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, NetworkProbeError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || Self::send_blocking(&agent, &request))
            .await
            .map_err(|e| NetworkProbeError::Aborted(e.to_string()))?
    }
}

/// A stage's exclusive handle on the transport
///
/// Released on drop, whichever way the stage exits.
pub struct ExecutionContext {
    transport: Arc<dyn HttpTransport>,
    stage: &'static str,
    requests: AtomicUsize,
}

impl ExecutionContext {
    pub fn open(transport: Arc<dyn HttpTransport>, stage: &'static str) -> Self {
        transport.context_opened(stage);
        tracing::debug!("Opened {} execution context", stage);
        Self {
            transport,
            stage,
            requests: AtomicUsize::new(0),
        }
    }

    pub async fn send(&self, request: HttpRequest) -> Result<HttpReply, NetworkProbeError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.transport.send(request).await
    }

    pub fn requests_sent(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        tracing::debug!(
            "Released {} execution context after {} requests",
            self.stage,
            self.requests_sent()
        );
        self.transport.context_released(self.stage);
    }
}

/// Join a base URL and a route path with exactly one slash
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x.test/", "/a"), "http://x.test/a");
        assert_eq!(join_url("http://x.test", "a"), "http://x.test/a");
        assert_eq!(join_url("http://x.test/", ""), "http://x.test");
    }

    #[tokio::test]
    async fn test_unreachable_target_is_network_error() {
        let transport = UreqTransport::new();
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkProbeError::Transport { .. }));
    }

    #[test]
    fn test_reply_header_lookup_is_case_insensitive() {
        let mut reply = HttpReply::new(200, "ok");
        reply
            .headers
            .push(("Content-Type".to_string(), "text/html".to_string()));
        assert_eq!(reply.header("content-type"), Some("text/html"));
    }
}
