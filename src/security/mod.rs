//! Adversarial payload probing
//!
//! Routes are probed one after another; the attempts of one route are in
//! flight together. Each attempt carries its payload through to its verdict,
//! so findings never depend on completion order. A network failure drops
//! only the attempt it hit.

pub mod classify;
pub mod payloads;

pub use payloads::{Payload, PayloadValue};

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::http::{join_url, ExecutionContext, HttpReply, HttpRequest};
use crate::{AuthProfile, RouteModel, SecurityFinding, Severity, VulnerabilityKind};

/// Verdict for one response; `Some(evidence)` when vulnerable
pub fn assess(payload: &Payload, reply: &HttpReply) -> Option<String> {
    match (&payload.kind, &payload.value) {
        (VulnerabilityKind::SqlInjection, _) => classify::sql_injection(reply.status, &reply.body),
        (VulnerabilityKind::Xss, PayloadValue::Field { value, .. }) => classify::xss(&reply.body, value),
        (VulnerabilityKind::Xss, _) => None,
        (VulnerabilityKind::PathTraversal, _) => classify::path_traversal(&reply.body),
        (VulnerabilityKind::OversizedPayload, _) => classify::oversized(reply.status),
        (VulnerabilityKind::NegativeValue, _) => classify::negative_value(reply.status, &reply.body),
        (VulnerabilityKind::UnauthorizedAccess, _) => classify::unauthorized(reply.status),
    }
}

/// Build the finding record for a classified response
pub fn finding(route: &RouteModel, payload: &Payload, reply: &HttpReply) -> SecurityFinding {
    let verdict = assess(payload, reply);
    let vulnerable = verdict.is_some();
    SecurityFinding {
        method: route.method,
        path: route.path.clone(),
        kind: payload.kind,
        field: payload.field().map(str::to_string),
        payload: payload.describe(),
        vulnerable,
        severity: if vulnerable {
            payload.kind.severity()
        } else {
            Severity::Info
        },
        status: reply.status,
        evidence: verdict.unwrap_or_else(|| format!("status {}, no indicator", reply.status)),
    }
}

pub struct SecurityProbeEngine<'a> {
    context: &'a ExecutionContext,
    base_url: &'a str,
    auth: &'a AuthProfile,
    token: Option<&'a str>,
    oversized_len: usize,
}

impl<'a> SecurityProbeEngine<'a> {
    pub fn new(
        context: &'a ExecutionContext,
        base_url: &'a str,
        auth: &'a AuthProfile,
        token: Option<&'a str>,
        oversized_len: usize,
    ) -> Self {
        Self {
            context,
            base_url,
            auth,
            token,
            oversized_len,
        }
    }

    /// Probe every route in order
    pub async fn run(&self, routes: &[RouteModel]) -> Vec<SecurityFinding> {
        let mut findings = Vec::new();
        for route in routes {
            findings.extend(self.probe_route(route).await);
        }
        findings
    }

    pub async fn probe_route(&self, route: &RouteModel) -> Vec<SecurityFinding> {
        let payloads = payloads::catalogue(route.auth_required, self.oversized_len);
        let attempts = payloads.iter().map(|payload| self.attempt(route, payload));
        let findings: Vec<SecurityFinding> = join_all(attempts).await.into_iter().flatten().collect();

        let vulnerable = findings.iter().filter(|f| f.vulnerable).count();
        if vulnerable > 0 {
            tracing::warn!("{}: {} vulnerable finding(s)", route, vulnerable);
        }
        findings
    }

    async fn attempt(&self, route: &RouteModel, payload: &Payload) -> Option<SecurityFinding> {
        let request = self.request(route, payload);
        match self.context.send(request).await {
            Ok(reply) => Some(finding(route, payload, &reply)),
            Err(e) => {
                tracing::warn!("Dropping {} attempt on {}: {}", payload.kind, route, e);
                None
            }
        }
    }

    /// Body for methods that carry one, query string otherwise
    pub fn request(&self, route: &RouteModel, payload: &Payload) -> HttpRequest {
        let mut request = HttpRequest::new(route.method, join_url(self.base_url, &route.concrete_path()));

        if route.auth_required && payload.value != PayloadValue::NoCredential {
            if let Some(token) = self.token {
                let (name, value) = self.auth.credential_header(token);
                request = request.header(name, value);
            }
        }

        let fields: Vec<(String, Value)> = match &payload.value {
            PayloadValue::Field { field, value } => vec![(field.to_string(), Value::String(value.clone()))],
            PayloadValue::Oversized { len } => vec![("data".to_string(), Value::String("A".repeat(*len)))],
            PayloadValue::Negative => payloads::NEGATIVE_FIELDS
                .iter()
                .map(|f| (f.to_string(), Value::from(-1)))
                .collect(),
            PayloadValue::NoCredential => Vec::new(),
        };
        if fields.is_empty() {
            return request;
        }

        if route.method.has_body() {
            let body: Map<String, Value> = fields.into_iter().collect();
            request.json(&Value::Object(body))
        } else {
            for (name, value) in fields {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                request = request.query(name, value);
            }
            request
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpTransport, NetworkProbeError};
    use crate::HttpMethod;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn sqli(value: &str) -> Payload {
        Payload {
            kind: VulnerabilityKind::SqlInjection,
            value: PayloadValue::Field {
                field: "query",
                value: value.to_string(),
            },
        }
    }

    #[test]
    fn test_sqli_classification() {
        let route = RouteModel::new(HttpMethod::Post, "/api/search", "a.js:1");
        let payload = sqli("' OR 1=1 --");

        let hit = finding(&route, &payload, &HttpReply::new(200, "error near 'SQL syntax'"));
        assert!(hit.vulnerable);
        assert_eq!(hit.severity, Severity::High);

        let clean = finding(&route, &payload, &HttpReply::new(200, "{\"results\": []}"));
        assert!(!clean.vulnerable);
        assert_eq!(clean.severity, Severity::Info);
    }

    /// Replies by request content and fails anything aimed at `input`
    struct Target;

    #[async_trait]
    impl HttpTransport for Target {
        async fn send(&self, request: HttpRequest) -> Result<HttpReply, NetworkProbeError> {
            let body = request.body.clone().unwrap_or_default();
            if body.contains("\"input\"") {
                return Err(NetworkProbeError::Transport {
                    method: request.method,
                    url: request.url,
                    message: "reset".to_string(),
                });
            }
            if request.headers.is_empty() {
                return Ok(HttpReply::new(200, "welcome"));
            }
            if body.contains("DROP TABLE") {
                return Ok(HttpReply::new(500, "SQLITE_ERROR: near \"DROP\""));
            }
            if body.len() > 1000 {
                return Ok(HttpReply::new(413, "too large"));
            }
            Ok(HttpReply::new(400, "{\"error\":\"invalid\"}"))
        }
    }

    #[tokio::test]
    async fn test_route_findings_pair_with_payloads() {
        let context = ExecutionContext::open(Arc::new(Target), "security");
        let auth = AuthProfile::default();
        let engine = SecurityProbeEngine::new(&context, "http://x.test", &auth, Some("tok"), 100_000);
        let route = RouteModel::new(HttpMethod::Post, "/api/items", "a.js:1").with_auth(true);

        let findings = engine.probe_route(&route).await;
        let total = payloads::catalogue(true, 100_000).len();
        // Attempts on the `input` field were dropped
        assert_eq!(findings.len(), total - payloads::XSS_PAYLOADS.len());
        assert!(!findings.iter().any(|f| f.field.as_deref() == Some("input")));

        let vulnerable: Vec<_> = findings.iter().filter(|f| f.vulnerable).collect();
        assert!(vulnerable.iter().any(|f| f.kind == VulnerabilityKind::UnauthorizedAccess));
        assert!(vulnerable.iter().any(|f| f.kind == VulnerabilityKind::OversizedPayload));
        let sqli: Vec<_> = vulnerable
            .iter()
            .filter(|f| f.kind == VulnerabilityKind::SqlInjection)
            .collect();
        assert_eq!(sqli.len(), payloads::SQLI_FIELDS.len());
        assert!(sqli.iter().all(|f| f.payload.contains("DROP TABLE")));
        assert!(!vulnerable.iter().any(|f| f.kind == VulnerabilityKind::NegativeValue));
    }

    #[test]
    fn test_get_payloads_go_in_query() {
        let transport: Arc<dyn HttpTransport> = Arc::new(Target);
        let context = ExecutionContext::open(transport, "security");
        let auth = AuthProfile::default();
        let engine = SecurityProbeEngine::new(&context, "http://x.test", &auth, None, 10);
        let route = RouteModel::new(HttpMethod::Get, "/api/files/:id", "a.js:1");

        let request = engine.request(
            &route,
            &Payload {
                kind: VulnerabilityKind::NegativeValue,
                value: PayloadValue::Negative,
            },
        );
        assert_eq!(request.url, "http://x.test/api/files/1");
        assert!(request.body.is_none());
        assert_eq!(request.query[0], ("id".to_string(), "-1".to_string()));
        assert!(request.headers.is_empty());
    }
}
