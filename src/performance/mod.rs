//! Concurrent load bursts per route

pub mod stats;

pub use stats::{compute_metrics, percentile, Burst};

use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AuthSettings, ProbeSettings};
use crate::http::{join_url, login, ExecutionContext, HttpRequest, HttpTransport};
use crate::{AuthProfile, PerformanceMetric, RouteModel};

/// Synthetic request body inferred from the path
pub fn synthetic_body(path: &str) -> serde_json::Value {
    let lower = path.to_lowercase();
    if lower.contains("user") {
        json!({"name": "Perf Test User", "email": "perf-test@example.com"})
    } else if lower.contains("product") {
        json!({"name": "Perf Test Product", "price": 9.99})
    } else {
        json!({"test": "data"})
    }
}

pub struct PerformanceProbeEngine {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    concurrency: usize,
    target_ms: u64,
}

impl PerformanceProbeEngine {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>, settings: &ProbeSettings) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            concurrency: settings.concurrency,
            target_ms: settings.latency_target_ms,
        }
    }

    /// Burst every route in order
    ///
    /// When a route needs auth, one login is made up front on this stage's
    /// own context.
    pub async fn run(
        &self,
        routes: &[RouteModel],
        auth: &AuthProfile,
        credentials: &AuthSettings,
    ) -> Vec<PerformanceMetric> {
        let context = ExecutionContext::open(self.transport.clone(), "performance");

        let token = if auth.present && routes.iter().any(|r| r.auth_required) {
            login(&context, &self.base_url, auth, credentials).await
        } else {
            None
        };
        let header = token.as_deref().map(|t| auth.credential_header(t));

        let mut metrics = Vec::new();
        for route in routes {
            let header = header.as_ref().filter(|_| route.auth_required);
            match self.burst(&context, route, header).await {
                Some(metric) => {
                    tracing::info!(
                        "{}: avg {:.0}ms, p95 {}ms, {:.1} req/s ({})",
                        route,
                        metric.average_ms,
                        metric.p95_ms,
                        metric.requests_per_second,
                        metric.status
                    );
                    metrics.push(metric);
                }
                None => tracing::warn!("{}: no request completed, no metric recorded", route),
            }
        }
        metrics
    }

    async fn burst(
        &self,
        context: &ExecutionContext,
        route: &RouteModel,
        header: Option<&(String, String)>,
    ) -> Option<PerformanceMetric> {
        let mut request = HttpRequest::new(route.method, join_url(&self.base_url, &route.concrete_path()));
        if let Some((name, value)) = header {
            request = request.header(name.clone(), value.clone());
        }
        if route.method.has_body() {
            request = request.json(&synthetic_body(&route.path));
        }

        let started = Instant::now();
        let timings = join_all((0..self.concurrency).map(|_| {
            let request = request.clone();
            async move {
                let sent = Instant::now();
                context
                    .send(request)
                    .await
                    .map(|_| sent.elapsed().as_millis() as u64)
            }
        }))
        .await;
        let wall_ms = started.elapsed().as_millis() as u64;

        let mut latencies = Vec::with_capacity(timings.len());
        let mut errors = 0;
        for timing in timings {
            match timing {
                Ok(ms) => latencies.push(ms),
                Err(e) => {
                    tracing::debug!("Dropping load request on {}: {}", route, e);
                    errors += 1;
                }
            }
        }

        compute_metrics(&Burst {
            method: route.method,
            path: &route.path,
            latencies: &latencies,
            errors,
            wall_ms,
            concurrency: self.concurrency,
            target_ms: self.target_ms,
        })
    }
}
