use serde::{Deserialize, Serialize};

use super::{ProbeCategory, Severity};

/// Category of an issue raised from an unrepairable probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Security,
    Error,
    Performance,
    Failure,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Security => "security",
            IssueCategory::Error => "error",
            IssueCategory::Performance => "performance",
            IssueCategory::Failure => "failure",
        }
    }
}

/// A probe that stayed broken after remediation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    pub suggestion: String,
    /// Probe the issue came from
    pub probe_id: String,
    pub probe_category: ProbeCategory,
}

/// Run-level advice derived from the full result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// "performance", "input_validation", "crash_risk" or "general_review"
    pub kind: String,
    pub priority: Severity,
    pub message: String,
}
