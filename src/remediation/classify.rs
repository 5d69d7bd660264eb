//! Keyword classification of unrepairable probes

use crate::{Issue, IssueCategory, ProbeCategory, ProbeResult, Severity};

const SECURITY_KEYWORDS: &[&str] = &["sql", "injection", "xss"];
const ERROR_KEYWORDS: &[&str] = &["500", "crash", "exception"];
const PERFORMANCE_KEYWORDS: &[&str] = &["timeout", "slow", "latency"];

/// Severity and category for a failure text; first matching rule wins
pub fn classify_error(error: &str) -> (Severity, IssueCategory) {
    let lower = error.to_lowercase();
    let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if hit(SECURITY_KEYWORDS) {
        (Severity::High, IssueCategory::Security)
    } else if hit(ERROR_KEYWORDS) {
        (Severity::Critical, IssueCategory::Error)
    } else if hit(PERFORMANCE_KEYWORDS) {
        (Severity::Medium, IssueCategory::Performance)
    } else {
        (Severity::Medium, IssueCategory::Failure)
    }
}

fn suggestion(category: IssueCategory, probe: ProbeCategory) -> &'static str {
    match (category, probe) {
        (IssueCategory::Security, ProbeCategory::Xss) => {
            "Escape user-controlled values before rendering them and set a Content-Security-Policy"
        }
        (IssueCategory::Security, _) => {
            "Use parameterized queries and validate input before it reaches the database"
        }
        (IssueCategory::Error, _) => {
            "Catch errors in the handler and return a 4xx status for bad input instead of crashing"
        }
        (IssueCategory::Performance, _) => {
            "Profile the handler; add indexes, caching or pagination for slow paths"
        }
        (IssueCategory::Failure, ProbeCategory::ExpiredToken) => {
            "Reject expired or forged tokens with 401 before running the handler"
        }
        (IssueCategory::Failure, ProbeCategory::MissingFields | ProbeCategory::WrongTypes | ProbeCategory::Malformed) => {
            "Validate the request body against a schema and answer 400 on mismatch"
        }
        (IssueCategory::Failure, _) => "Review the endpoint behavior against the failing probe",
    }
}

/// Issue for a probe that remediation could not repair
pub fn issue_for(result: &ProbeResult) -> Issue {
    let error = result.error.as_deref().unwrap_or("probe failed");
    let (severity, category) = classify_error(error);
    let summary = error.lines().find(|l| !l.trim().is_empty()).unwrap_or(error);
    let probe = &result.probe;

    Issue {
        severity,
        category,
        message: format!(
            "{} {} ({}): {}",
            probe.route.method,
            probe.route.path,
            probe.category.describe(),
            summary.trim()
        ),
        suggestion: suggestion(category, probe.category).to_string(),
        probe_id: probe.id.clone(),
        probe_category: probe.category,
    }
}
