use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// Speed class of a route by average latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedClass {
    Fast,
    Moderate,
    Slow,
    VerySlow,
}

impl SpeedClass {
    /// <200ms fast, <500ms moderate, <1000ms slow, else very slow
    pub fn classify(average_ms: f64) -> Self {
        if average_ms < 200.0 {
            SpeedClass::Fast
        } else if average_ms < 500.0 {
            SpeedClass::Moderate
        } else if average_ms < 1000.0 {
            SpeedClass::Slow
        } else {
            SpeedClass::VerySlow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedClass::Fast => "fast",
            SpeedClass::Moderate => "moderate",
            SpeedClass::Slow => "slow",
            SpeedClass::VerySlow => "very_slow",
        }
    }
}

impl std::fmt::Display for SpeedClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latency distribution of one route's concurrent batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub method: HttpMethod,
    pub path: String,
    /// Requests issued in the burst
    pub concurrency: usize,
    /// Requests that completed (any status)
    pub completed: usize,
    /// Requests dropped on a network error
    pub errors: usize,
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub requests_per_second: f64,
    /// Completed requests slower than the latency target
    pub over_target: usize,
    pub status: SpeedClass,
}
