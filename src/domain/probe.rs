use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::RouteModel;

/// Fixed catalogue of probe scenarios synthesized per route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeCategory {
    Happy,
    Malformed,
    MissingFields,
    WrongTypes,
    ExpiredToken,
    Sqli,
    Xss,
    LargePayload,
    Concurrency,
}

impl ProbeCategory {
    pub const ALL: [ProbeCategory; 9] = [
        ProbeCategory::Happy,
        ProbeCategory::Malformed,
        ProbeCategory::MissingFields,
        ProbeCategory::WrongTypes,
        ProbeCategory::ExpiredToken,
        ProbeCategory::Sqli,
        ProbeCategory::Xss,
        ProbeCategory::LargePayload,
        ProbeCategory::Concurrency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeCategory::Happy => "happy",
            ProbeCategory::Malformed => "malformed",
            ProbeCategory::MissingFields => "missing_fields",
            ProbeCategory::WrongTypes => "wrong_types",
            ProbeCategory::ExpiredToken => "expired_token",
            ProbeCategory::Sqli => "sqli",
            ProbeCategory::Xss => "xss",
            ProbeCategory::LargePayload => "large_payload",
            ProbeCategory::Concurrency => "concurrency",
        }
    }

    /// Human-readable scenario description used in test names and prompts
    pub fn describe(&self) -> &'static str {
        match self {
            ProbeCategory::Happy => "happy path",
            ProbeCategory::Malformed => "malformed input",
            ProbeCategory::MissingFields => "missing required fields",
            ProbeCategory::WrongTypes => "wrong field types",
            ProbeCategory::ExpiredToken => "expired or forged token",
            ProbeCategory::Sqli => "SQL injection",
            ProbeCategory::Xss => "cross-site scripting",
            ProbeCategory::LargePayload => "oversized payload",
            ProbeCategory::Concurrency => "concurrent requests",
        }
    }

    /// Categories that apply to a route
    pub fn for_route(route: &RouteModel) -> Vec<ProbeCategory> {
        Self::ALL
            .into_iter()
            .filter(|c| *c != ProbeCategory::ExpiredToken || route.auth_required)
            .collect()
    }
}

impl std::fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the current probe body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOrigin {
    Template,
    Generated,
    Remediated,
}

/// A synthesized probe
///
/// `code` may be overwritten in place by remediation; the probe keeps its id.
/// Ids are unique within a run: a route whose stem was already used gets an
/// occurrence number (`get_api_items-2_happy`). Stems never contain `-`, so
/// a suffixed id cannot collide with another route's plain id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSpec {
    /// `<method>_<sanitized-path>[-<occurrence>]_<category>`
    pub id: String,
    pub route: RouteModel,
    pub category: ProbeCategory,
    /// Self-contained probe body
    pub code: String,
    pub origin: ProbeOrigin,
    /// Persisted copy of `code`, read back by the sandbox
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ProbeSpec {
    pub fn new(route: RouteModel, category: ProbeCategory, code: impl Into<String>) -> Self {
        let id = format!("{}_{}", route.file_stem(), category.as_str());
        Self {
            id,
            route,
            category,
            code: code.into(),
            origin: ProbeOrigin::Template,
            file: None,
        }
    }

    /// Re-key for the `occurrence`-th route sharing this stem (1-based)
    pub fn with_occurrence(mut self, occurrence: usize) -> Self {
        if occurrence > 1 {
            self.id = format!(
                "{}-{}_{}",
                self.route.file_stem(),
                occurrence,
                self.category.as_str()
            );
        }
        self
    }
}

/// Classification of a probe failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Probe file unavailable
    Read,
    /// Body outside the probe grammar
    Compile,
    /// An expectation failed
    Assertion,
    /// The live request failed
    Network,
}

/// Outcome of executing one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub probe: ProbeSpec,
    pub passed: bool,
    pub error: Option<String>,
    pub error_kind: Option<ProbeErrorKind>,
    pub duration_ms: u64,
    /// Set when remediation produced a structurally valid replacement
    #[serde(default)]
    pub fixed: bool,
    /// Number of backend attempts spent on remediation
    #[serde(default)]
    pub remediation_attempts: u32,
}

impl ProbeResult {
    pub fn passed(probe: ProbeSpec, duration_ms: u64) -> Self {
        Self {
            probe,
            passed: true,
            error: None,
            error_kind: None,
            duration_ms,
            fixed: false,
            remediation_attempts: 0,
        }
    }

    pub fn failed(
        probe: ProbeSpec,
        kind: ProbeErrorKind,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            probe,
            passed: false,
            error: Some(error.into()),
            error_kind: Some(kind),
            duration_ms,
            fixed: false,
            remediation_attempts: 0,
        }
    }
}
