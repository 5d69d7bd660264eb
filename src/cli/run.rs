//! Run command implementation

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use routeprobe::http::UreqTransport;
use routeprobe::llm::backend_from_settings;
use routeprobe::pipeline::{DocumentSource, PipelineOrchestrator, RunRequest};
use routeprobe::RunReport;

/// CLI settings that can override config.toml values
#[derive(Debug, Default)]
pub struct CliSettings {
    pub base_url: String,
    /// Interface document URL or path
    pub spec: Option<String>,
    /// Report destination
    pub output: Option<PathBuf>,
    pub skip_security: bool,
    pub skip_performance: bool,
    /// Force template-only synthesis
    pub no_generate: bool,
}

/// Run the pipeline and print a summary
pub async fn run_command(
    path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    cli_settings: CliSettings,
) -> Result<()> {
    let work_dir = path.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = super::load_config(&work_dir, config_path.as_ref())?;

    if cli_settings.no_generate {
        config.probe.generate = false;
    }

    // A document alone runs in a temporary workspace; otherwise the project
    // (explicit or the current directory) is scanned and hosts the probes
    let mut request = RunRequest::new(&cli_settings.base_url)
        .skip_security(cli_settings.skip_security)
        .skip_performance(cli_settings.skip_performance);
    match &cli_settings.spec {
        Some(spec) => {
            request = request.document(DocumentSource::parse(spec));
            if let Some(project) = path {
                request = request.project(project);
            }
        }
        None => request = request.project(work_dir),
    }

    let backend = backend_from_settings(&config.llm);
    let orchestrator = PipelineOrchestrator::new(config, Arc::new(UreqTransport::new()), backend);
    let report = orchestrator.run(&request).await?;

    print_summary(&report);

    if let Some(output) = &cli_settings.output {
        report
            .write_json(output)
            .with_context(|| format!("Failed to save report to {}", output.display()))?;
        println!("\nReport written to {}", output.display());
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("Run {} against {}", report.run_id, report.base_url);
    println!(
        "  Routes: {} (auth {})",
        report.routes_found,
        if report.auth_detected { "detected" } else { "not detected" }
    );
    println!(
        "  Probes: {} total, {} passed, {} failed ({:.0}%), {} fixed",
        report.probes_total,
        report.probes_passed,
        report.probes_failed,
        report.failure_rate() * 100.0,
        report.probes_fixed
    );

    if !report.issues.is_empty() {
        println!("\nIssues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  [{}/{}] {}", issue.severity, issue.category.as_str(), issue.message);
            println!("    {}", issue.suggestion);
        }
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for rec in &report.recommendations {
            println!("  [{}] {}", rec.priority, rec.message);
        }
    }

    let vulnerable: Vec<_> = report.security_findings.iter().filter(|f| f.vulnerable).collect();
    if !vulnerable.is_empty() {
        println!("\nVulnerabilities ({}):", report.vulnerabilities_found);
        for finding in vulnerable {
            println!(
                "  [{}] {} {} {}: {}",
                finding.severity, finding.method, finding.path, finding.kind, finding.evidence
            );
        }
    }

    if !report.performance_metrics.is_empty() {
        println!("\nPerformance:");
        for metric in &report.performance_metrics {
            println!(
                "  {} {}: avg {:.0}ms, p95 {}ms, p99 {}ms, {:.1} req/s [{}]",
                metric.method,
                metric.path,
                metric.average_ms,
                metric.p95_ms,
                metric.p99_ms,
                metric.requests_per_second,
                metric.status
            );
        }
    }
}
