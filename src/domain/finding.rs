//! Security probe findings

use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// Severity levels shared by findings and issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload families of the security taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityKind {
    SqlInjection,
    Xss,
    PathTraversal,
    OversizedPayload,
    NegativeValue,
    UnauthorizedAccess,
}

impl VulnerabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityKind::SqlInjection => "sql_injection",
            VulnerabilityKind::Xss => "xss",
            VulnerabilityKind::PathTraversal => "path_traversal",
            VulnerabilityKind::OversizedPayload => "oversized_payload",
            VulnerabilityKind::NegativeValue => "negative_value",
            VulnerabilityKind::UnauthorizedAccess => "unauthorized_access",
        }
    }

    /// Severity reported when this kind is found vulnerable
    pub fn severity(&self) -> Severity {
        match self {
            VulnerabilityKind::SqlInjection => Severity::High,
            VulnerabilityKind::Xss => Severity::High,
            VulnerabilityKind::PathTraversal => Severity::Critical,
            VulnerabilityKind::OversizedPayload => Severity::Medium,
            VulnerabilityKind::NegativeValue => Severity::Medium,
            VulnerabilityKind::UnauthorizedAccess => Severity::Critical,
        }
    }
}

impl std::fmt::Display for VulnerabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one security payload attempt, keyed by (route, payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    pub method: HttpMethod,
    pub path: String,
    pub kind: VulnerabilityKind,
    /// Field the payload was placed in, if any
    pub field: Option<String>,
    /// Payload as sent (oversized bodies are summarised)
    pub payload: String,
    pub vulnerable: bool,
    /// Kind severity when vulnerable, `info` otherwise
    pub severity: Severity,
    pub status: u16,
    /// Short explanation of the verdict
    pub evidence: String,
}
