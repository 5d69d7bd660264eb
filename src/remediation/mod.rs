//! Bounded repair of failed probes
//!
//! A failed probe gets at most `max_attempts` backend rewrites. The first
//! rewrite that passes the structural gate marks the probe fixed; the probe is
//! not executed again. When every attempt is spent the probe becomes exactly
//! one [`Issue`].

pub mod classify;
pub mod recommend;

pub use classify::{classify_error, issue_for};
pub use recommend::recommend;

use std::sync::Arc;

use crate::llm::{extract_code, CompletionBackend, GenerationError};
use crate::synth::{gate, ProbeStore, SYSTEM_PROMPT};
use crate::{Issue, ProbeOrigin, ProbeResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const REMEDIATE_TEMPLATE: &str = "This API test failed against {method} {path} ({category} scenario, authentication required: {auth}).
It ran for {duration}ms and failed with:
{error}

Fix the test so it checks the endpoint correctly. Keep the BASE_URL placeholder and the authToken variable.
Return only the complete corrected test file.

Current test:
{code}";

/// Prompt for one repair attempt
pub fn remediation_prompt(result: &ProbeResult) -> String {
    let probe = &result.probe;
    REMEDIATE_TEMPLATE
        .replace("{method}", probe.route.method.as_str())
        .replace("{path}", &probe.route.path)
        .replace("{category}", probe.category.describe())
        .replace("{auth}", if probe.route.auth_required { "yes" } else { "no" })
        .replace("{duration}", &result.duration_ms.to_string())
        .replace("{error}", result.error.as_deref().unwrap_or("unknown error"))
        .replace("{code}", &probe.code)
}

#[derive(Debug, Clone)]
pub enum RemediationOutcome {
    /// A rewrite passed the structural gate
    Fixed(ProbeResult),
    /// Attempts exhausted; the probe is reported as an issue
    Exhausted { result: ProbeResult, issue: Issue },
}

impl RemediationOutcome {
    pub fn into_parts(self) -> (ProbeResult, Option<Issue>) {
        match self {
            RemediationOutcome::Fixed(result) => (result, None),
            RemediationOutcome::Exhausted { result, issue } => (result, Some(issue)),
        }
    }
}

pub struct RemediationLoop {
    backend: Arc<dyn CompletionBackend>,
    store: ProbeStore,
    max_attempts: u32,
}

impl RemediationLoop {
    pub fn new(backend: Arc<dyn CompletionBackend>, store: ProbeStore, max_attempts: u32) -> Self {
        Self {
            backend,
            store,
            max_attempts,
        }
    }

    /// Repair one failed probe
    ///
    /// Every attempt is prompted with the original failing code. Only a
    /// candidate that passes the gate replaces it and is persisted.
    pub async fn remediate(&self, mut result: ProbeResult) -> RemediationOutcome {
        for attempt in 1..=self.max_attempts {
            result.remediation_attempts = attempt;
            let prompt = remediation_prompt(&result);

            let reply = match self.backend.complete(&prompt, Some(SYSTEM_PROMPT)).await {
                Ok(reply) => reply,
                Err(GenerationError::Disabled) => break,
                Err(e) => {
                    tracing::warn!(
                        "Remediation attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        result.probe.id,
                        e
                    );
                    continue;
                }
            };

            let candidate = extract_code(&reply);
            if gate::accepts(&candidate) {
                result.probe.code = candidate;
                result.probe.origin = ProbeOrigin::Remediated;
                result.fixed = true;
                match self.store.write(&result.probe) {
                    Ok(path) => result.probe.file = Some(path),
                    Err(e) => tracing::warn!("Failed to persist fix for {}: {}", result.probe.id, e),
                }
                tracing::info!("Fixed {} after {} attempt(s)", result.probe.id, attempt);
                return RemediationOutcome::Fixed(result);
            }
            tracing::debug!(
                "Remediation attempt {}/{} for {} failed the structural gate",
                attempt,
                self.max_attempts,
                result.probe.id
            );
        }

        let issue = issue_for(&result);
        RemediationOutcome::Exhausted { result, issue }
    }
}
