use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{Context, Result};

use super::{Issue, PerformanceMetric, ProbeResult, Recommendation, RouteModel, SecurityFinding};

/// Aggregate result of one pipeline run
///
/// Always produced once discovery succeeds, even when every probe failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub routes_found: usize,
    pub auth_detected: bool,
    pub routes: Vec<RouteModel>,

    pub probes_total: usize,
    pub probes_passed: usize,
    pub probes_failed: usize,
    /// Failed probes that remediation repaired
    pub probes_fixed: usize,
    pub probe_results: Vec<ProbeResult>,

    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,

    pub security_findings: Vec<SecurityFinding>,
    pub vulnerabilities_found: usize,
    pub performance_metrics: Vec<PerformanceMetric>,
}

impl RunReport {
    /// Fraction of probes that failed (0.0 with no probes)
    pub fn failure_rate(&self) -> f64 {
        if self.probes_total == 0 {
            0.0
        } else {
            self.probes_failed as f64 / self.probes_total as f64
        }
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }
}
