//! Discovery → synthesis → execution → remediation run
//!
//! Only an unreadable project root or a malformed interface document aborts
//! a run. Everything later degrades into the report instead.

mod context;
mod progress;

pub use context::RunContext;
pub use progress::ProgressSink;

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::Config;
use crate::discovery::{self, Discovery, InterfaceDocument, SpecFormatError};
use crate::http::{login, ExecutionContext, HttpTransport};
use crate::llm::CompletionBackend;
use crate::performance::PerformanceProbeEngine;
use crate::remediation::{recommend, RemediationLoop};
use crate::sandbox::ExecutionSandbox;
use crate::scanner::{ScanError, SourceScanner};
use crate::security::SecurityProbeEngine;
use crate::synth::{ProbeStore, ProbeSynthesizer};
use crate::{ProbeResult, ProbeSpec, RunReport};

const DOCUMENT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A run that could not produce a report
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    SpecFormat(#[from] SpecFormatError),

    #[error("Nothing to discover: give a project path or an interface document")]
    NoSource,

    #[error("Failed to prepare the probe workspace: {0}")]
    Workspace(#[source] std::io::Error),
}

/// Where an interface document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
}

impl DocumentSource {
    /// URLs start with a scheme; anything else is a local path
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            DocumentSource::Url(value.to_string())
        } else {
            DocumentSource::File(PathBuf::from(value))
        }
    }

    async fn load(&self) -> Result<InterfaceDocument, SpecFormatError> {
        match self {
            DocumentSource::Url(url) => {
                let target = url.clone();
                tokio::task::spawn_blocking(move || InterfaceDocument::fetch(&target, DOCUMENT_FETCH_TIMEOUT))
                    .await
                    .map_err(|e| SpecFormatError::Fetch {
                        url: url.clone(),
                        message: e.to_string(),
                    })?
            }
            DocumentSource::File(path) => InterfaceDocument::from_file(path),
        }
    }
}

/// What to run against
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub base_url: String,
    /// Project tree to scan; also hosts the generated-probes directory
    pub project: Option<PathBuf>,
    /// Interface document; takes precedence over the project for discovery
    pub document: Option<DocumentSource>,
    pub skip_security: bool,
    pub skip_performance: bool,
}

impl RunRequest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            project: None,
            document: None,
            skip_security: false,
            skip_performance: false,
        }
    }

    pub fn project(mut self, path: impl Into<PathBuf>) -> Self {
        self.project = Some(path.into());
        self
    }

    pub fn document(mut self, source: DocumentSource) -> Self {
        self.document = Some(source);
        self
    }

    pub fn skip_security(mut self, skip: bool) -> Self {
        self.skip_security = skip;
        self
    }

    pub fn skip_performance(mut self, skip: bool) -> Self {
        self.skip_performance = skip;
        self
    }
}

/// Probe directory for one run; a temporary one is removed on drop
enum Workspace {
    Project(PathBuf),
    Temporary(TempDir),
}

impl Workspace {
    fn prepare(request: &RunRequest, config: &Config) -> Result<Self, PipelineError> {
        match &request.project {
            Some(project) => Ok(Workspace::Project(project.join(&config.settings.generated_dir))),
            None => tempfile::Builder::new()
                .prefix("routeprobe-")
                .tempdir()
                .map(Workspace::Temporary)
                .map_err(PipelineError::Workspace),
        }
    }

    fn probe_dir(&self) -> PathBuf {
        match self {
            Workspace::Project(dir) => dir.clone(),
            Workspace::Temporary(temp) => temp.path().join("generated-tests"),
        }
    }
}

pub struct PipelineOrchestrator {
    config: Config,
    transport: Arc<dyn HttpTransport>,
    backend: Arc<dyn CompletionBackend>,
    progress: ProgressSink,
}

impl PipelineOrchestrator {
    pub fn new(config: Config, transport: Arc<dyn HttpTransport>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            config,
            transport,
            backend,
            progress: ProgressSink::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Discovery only
    pub async fn discover(&self, request: &RunRequest) -> Result<Discovery, PipelineError> {
        if let Some(source) = &request.document {
            self.progress.info(format!("Loading interface document {:?}", source));
            let document = source.load().await?;
            return Ok(discovery::discover_document(&document));
        }
        let Some(project) = &request.project else {
            return Err(PipelineError::NoSource);
        };
        self.progress.info(format!("Scanning {}", project.display()));
        let scanner = SourceScanner::with_config(
            project,
            &self.config.settings.scan_exclude,
            &self.config.settings.source_extensions,
        );
        Ok(discovery::discover_project(&scanner)?)
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        let found = match self.discover(request).await {
            Ok(found) => found,
            Err(e) => {
                self.progress.error(format!("Discovery failed: {}", e));
                return Err(e);
            }
        };
        self.progress.success(format!(
            "Found {} routes (auth {})",
            found.routes.len(),
            if found.auth.present { "detected" } else { "not detected" }
        ));

        let workspace = Workspace::prepare(request, &self.config)?;
        let store = ProbeStore::new(workspace.probe_dir());

        let token = if found.auth.present {
            let context = ExecutionContext::open(self.transport.clone(), "auth");
            let token = login(&context, &request.base_url, &found.auth, &self.config.auth).await;
            if token.is_none() {
                self.progress
                    .warning("Login failed; authenticated probes will run without a token");
            }
            token
        } else {
            None
        };
        let run = RunContext::new(&request.base_url, found.auth, token);
        let routes = found.routes;

        // Synthesis
        let mut synthesizer = ProbeSynthesizer::new(self.backend.clone(), store.clone(), &self.config.probe);
        let mut synthesized: Vec<Vec<ProbeSpec>> = Vec::with_capacity(routes.len());
        for route in &routes {
            synthesized.push(synthesizer.synthesize(route, &run.auth).await);
        }
        let total: usize = synthesized.iter().map(Vec::len).sum();
        self.progress.info(format!(
            "Synthesized {} probes into {}",
            total,
            store.dir().display()
        ));

        // Execution
        let sandbox = ExecutionSandbox::new(self.transport.clone(), &run.base_url)
            .with_auth_token(run.token.clone());
        let mut results: Vec<ProbeResult> = Vec::with_capacity(total);
        for probes in &synthesized {
            results.extend(sandbox.execute_route(probes).await);
        }
        let passed = results.iter().filter(|r| r.passed).count();
        self.progress.info(format!("{}/{} probes passed", passed, results.len()));

        // Remediation
        let remediation = RemediationLoop::new(
            self.backend.clone(),
            store.clone(),
            self.config.probe.remediation_attempts,
        );
        let mut issues = Vec::new();
        for result in &mut results {
            if result.passed {
                continue;
            }
            let (remediated, issue) = remediation.remediate(result.clone()).await.into_parts();
            *result = remediated;
            issues.extend(issue);
        }
        let fixed = results.iter().filter(|r| r.fixed).count();
        if fixed > 0 {
            self.progress.success(format!("Remediation fixed {} probes", fixed));
        }
        if !issues.is_empty() {
            self.progress.warning(format!("{} issues found", issues.len()));
        }
        let recommendations = recommend(&results, &issues);

        // Security
        let security_findings = if request.skip_security {
            Vec::new()
        } else {
            self.progress.info("Running security probes");
            let context = ExecutionContext::open(self.transport.clone(), "security");
            SecurityProbeEngine::new(
                &context,
                &run.base_url,
                &run.auth,
                run.token(),
                self.config.probe.oversized_payload_len,
            )
            .run(&routes)
            .await
        };
        let vulnerabilities = security_findings.iter().filter(|f| f.vulnerable).count();
        if vulnerabilities > 0 {
            self.progress
                .warning(format!("{} potential vulnerabilities", vulnerabilities));
        }

        // Performance
        let performance_metrics = if request.skip_performance {
            Vec::new()
        } else {
            self.progress.info("Running performance probes");
            PerformanceProbeEngine::new(self.transport.clone(), &run.base_url, &self.config.probe)
                .run(&routes, &run.auth, &self.config.auth)
                .await
        };

        let report = RunReport {
            run_id: run.run_id.clone(),
            base_url: run.base_url.clone(),
            started_at: run.started_at,
            finished_at: Utc::now(),
            routes_found: routes.len(),
            auth_detected: run.auth.present,
            probes_total: results.len(),
            probes_passed: passed,
            probes_failed: results.len() - passed,
            probes_fixed: fixed,
            probe_results: results,
            issues,
            recommendations,
            vulnerabilities_found: vulnerabilities,
            security_findings,
            performance_metrics,
            routes,
        };

        drop(workspace);
        self.progress.success(format!(
            "Run {} complete: {}/{} probes passed",
            report.run_id, report.probes_passed, report.probes_total
        ));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_source_parse() {
        assert_eq!(
            DocumentSource::parse("https://api.test/openapi.json"),
            DocumentSource::Url("https://api.test/openapi.json".to_string())
        );
        assert_eq!(
            DocumentSource::parse("docs/openapi.json"),
            DocumentSource::File(PathBuf::from("docs/openapi.json"))
        );
    }

    #[tokio::test]
    async fn test_no_source_is_error() {
        let orchestrator = PipelineOrchestrator::new(
            Config::default(),
            Arc::new(crate::http::UreqTransport::new()),
            Arc::new(crate::llm::DisabledBackend),
        );
        let err = orchestrator.run(&RunRequest::new("http://x.test")).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoSource));
    }
}
