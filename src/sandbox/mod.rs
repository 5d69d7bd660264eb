//! Probe execution sandbox
//!
//! A probe body is never evaluated as host code. It is tokenized, parsed into
//! a closed grammar (one HTTP primitive plus a fixed set of matchers) and
//! walked by [`interpreter::Interpreter`]. Each probe moves through
//! `Idle -> Loaded -> Executing -> {Passed, Failed}`; the request context is
//! opened on entering `Executing` and released when the probe reaches a
//! terminal state, whatever the outcome.

pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use parser::{parse, CompileError, Program};

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;

use crate::http::{ExecutionContext, HttpTransport};
use crate::{ProbeErrorKind, ProbeResult, ProbeSpec};
use interpreter::Interpreter;

/// Placeholder replaced with the live target URL before a probe is parsed
pub const BASE_URL_PLACEHOLDER: &str = "BASE_URL";

/// A probe failed inside the sandbox; always converted into a failed result
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeExecutionError {
    #[error("Failed to read probe file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Probe does not compile at line {line}: {message}")]
    Compile { line: usize, message: String },

    #[error("{0}")]
    Assertion(String),

    #[error("{0}")]
    Network(String),
}

impl ProbeExecutionError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeExecutionError::Read { .. } => ProbeErrorKind::Read,
            ProbeExecutionError::Compile { .. } => ProbeErrorKind::Compile,
            ProbeExecutionError::Assertion(_) => ProbeErrorKind::Assertion,
            ProbeExecutionError::Network(_) => ProbeErrorKind::Network,
        }
    }
}

impl From<CompileError> for ProbeExecutionError {
    fn from(e: CompileError) -> Self {
        ProbeExecutionError::Compile {
            line: e.line,
            message: e.message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Idle,
    Loaded,
    Executing,
    Passed,
    Failed,
}

impl SandboxState {
    fn can_move_to(&self, next: SandboxState) -> bool {
        matches!(
            (self, next),
            (SandboxState::Idle, SandboxState::Loaded)
                | (SandboxState::Idle, SandboxState::Failed)
                | (SandboxState::Loaded, SandboxState::Executing)
                | (SandboxState::Executing, SandboxState::Passed)
                | (SandboxState::Executing, SandboxState::Failed)
        )
    }
}

/// States one probe passed through
#[derive(Debug, Clone)]
pub struct Lifecycle {
    states: Vec<SandboxState>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            states: vec![SandboxState::Idle],
        }
    }

    pub fn current(&self) -> SandboxState {
        self.states.last().copied().unwrap_or(SandboxState::Idle)
    }

    pub fn states(&self) -> &[SandboxState] {
        &self.states
    }

    fn advance(&mut self, next: SandboxState) {
        let current = self.current();
        if current.can_move_to(next) {
            self.states.push(next);
        } else {
            tracing::warn!("Ignoring sandbox transition {:?} -> {:?}", current, next);
        }
    }
}

/// A probe's result plus the states it went through
#[derive(Debug, Clone)]
pub struct SandboxRun {
    pub result: ProbeResult,
    pub lifecycle: Lifecycle,
}

/// Replace the base URL placeholder with the live target
///
/// `${BASE_URL}` inside template literals is handled first so the result
/// stays a plain string.
pub fn substitute_base_url(code: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    code.replace(&format!("${{{}}}", BASE_URL_PLACEHOLDER), base)
        .replace(BASE_URL_PLACEHOLDER, base)
}

/// Runs probes against the live target
#[derive(Clone)]
pub struct ExecutionSandbox {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    auth_token: Option<String>,
}

impl ExecutionSandbox {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Execute one probe; failures become a failed result, never an error
    pub async fn execute(&self, probe: &ProbeSpec) -> ProbeResult {
        self.run(probe).await.result
    }

    /// Execute all probes of a route concurrently
    ///
    /// Each result carries its own probe, so results are paired with probes
    /// regardless of completion order.
    pub async fn execute_route(&self, probes: &[ProbeSpec]) -> Vec<ProbeResult> {
        join_all(probes.iter().map(|probe| self.execute(probe))).await
    }

    pub async fn run(&self, probe: &ProbeSpec) -> SandboxRun {
        let started = Instant::now();
        let mut lifecycle = Lifecycle::new();

        let program = match self.load(probe).await {
            Ok(program) => program,
            Err(e) => {
                lifecycle.advance(SandboxState::Failed);
                tracing::debug!("Probe {} failed to load: {}", probe.id, e);
                return SandboxRun {
                    result: failed(probe, &e, started),
                    lifecycle,
                };
            }
        };
        lifecycle.advance(SandboxState::Loaded);

        let outcome = {
            let context = ExecutionContext::open(self.transport.clone(), "probe");
            lifecycle.advance(SandboxState::Executing);
            let token = self.auth_token.as_deref().unwrap_or("");
            Interpreter::new(&context, &self.base_url, token)
                .run(&program)
                .await
        };

        let result = match outcome {
            Ok(()) => {
                lifecycle.advance(SandboxState::Passed);
                ProbeResult::passed(probe.clone(), elapsed_ms(started))
            }
            Err(e) => {
                lifecycle.advance(SandboxState::Failed);
                tracing::debug!("Probe {} failed: {}", probe.id, e);
                failed(probe, &e, started)
            }
        };
        SandboxRun { result, lifecycle }
    }

    async fn load(&self, probe: &ProbeSpec) -> Result<Program, ProbeExecutionError> {
        let code = match &probe.file {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ProbeExecutionError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            })?,
            None => probe.code.clone(),
        };
        let code = substitute_base_url(&code, &self.base_url);
        Ok(parse(&code)?)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn failed(probe: &ProbeSpec, error: &ProbeExecutionError, started: Instant) -> ProbeResult {
    ProbeResult::failed(probe.clone(), error.kind(), error.to_string(), elapsed_ms(started))
}
