use crate::{Issue, IssueCategory, ProbeResult, Recommendation, Severity};

/// Average probe duration above which a performance recommendation is made
pub const SLOW_AVERAGE_MS: f64 = 5000.0;
/// Failure rate above which a general review is recommended
pub const FAILURE_RATE_THRESHOLD: f64 = 0.3;

/// Run-level recommendations from the full result set
pub fn recommend(results: &[ProbeResult], issues: &[Issue]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !results.is_empty() {
        let average =
            results.iter().map(|r| r.duration_ms as f64).sum::<f64>() / results.len() as f64;
        if average > SLOW_AVERAGE_MS {
            recommendations.push(Recommendation {
                kind: "performance".to_string(),
                priority: Severity::Medium,
                message: format!(
                    "Probes took {:.0}ms on average; look for slow handlers, missing indexes or blocking calls",
                    average
                ),
            });
        }
    }

    if issues.iter().any(|i| i.category == IssueCategory::Security) {
        recommendations.push(Recommendation {
            kind: "input_validation".to_string(),
            priority: Severity::High,
            message: "Security probes failed; validate and sanitize all user input, and use parameterized queries".to_string(),
        });
    }

    if issues.iter().any(|i| i.severity == Severity::Critical) {
        recommendations.push(Recommendation {
            kind: "crash_risk".to_string(),
            priority: Severity::Critical,
            message: "Some inputs crash the server; add error handling so bad requests get a 4xx response".to_string(),
        });
    }

    if !results.is_empty() {
        let failed = results.iter().filter(|r| !r.passed).count();
        let rate = failed as f64 / results.len() as f64;
        if rate > FAILURE_RATE_THRESHOLD {
            recommendations.push(Recommendation {
                kind: "general_review".to_string(),
                priority: Severity::Medium,
                message: format!(
                    "{:.0}% of probes failed; review the API's input handling and error responses",
                    rate * 100.0
                ),
            });
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpMethod, ProbeCategory, ProbeErrorKind, ProbeSpec, RouteModel};

    fn result(passed: bool, duration_ms: u64) -> ProbeResult {
        let route = RouteModel::new(HttpMethod::Get, "/a", "a.js:1");
        let probe = ProbeSpec::new(route, ProbeCategory::Happy, "");
        if passed {
            ProbeResult::passed(probe, duration_ms)
        } else {
            ProbeResult::failed(probe, ProbeErrorKind::Assertion, "x", duration_ms)
        }
    }

    fn issue(severity: Severity, category: IssueCategory) -> Issue {
        Issue {
            severity,
            category,
            message: String::new(),
            suggestion: String::new(),
            probe_id: "get_a_happy".to_string(),
            probe_category: ProbeCategory::Happy,
        }
    }

    fn kinds(recommendations: &[Recommendation]) -> Vec<&str> {
        recommendations.iter().map(|r| r.kind.as_str()).collect()
    }

    #[test]
    fn test_no_recommendations_for_healthy_run() {
        let results = vec![result(true, 10), result(true, 20), result(false, 30), result(true, 5)];
        assert!(recommend(&results, &[]).is_empty());
    }

    #[test]
    fn test_all_thresholds() {
        let results = vec![result(false, 6000), result(false, 6000), result(true, 6000)];
        let issues = vec![
            issue(Severity::High, IssueCategory::Security),
            issue(Severity::Critical, IssueCategory::Error),
        ];
        assert_eq!(
            kinds(&recommend(&results, &issues)),
            vec!["performance", "input_validation", "crash_risk", "general_review"]
        );
    }

    #[test]
    fn test_failure_rate_boundary() {
        // Exactly 30% is not above the threshold
        let mut results: Vec<_> = (0..7).map(|_| result(true, 1)).collect();
        results.extend((0..3).map(|_| result(false, 1)));
        assert!(recommend(&results, &[]).is_empty());
    }
}
