//! Latency statistics for one burst

use crate::{HttpMethod, PerformanceMetric, SpeedClass};

/// Index lookup into a sorted sample at `floor(q * n)`, clamped to the last
/// element
pub fn percentile(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let index = ((q * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Inputs for [`compute_metrics`]
#[derive(Debug, Clone)]
pub struct Burst<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    /// Latencies of completed requests, any order
    pub latencies: &'a [u64],
    /// Requests dropped on a network error
    pub errors: usize,
    pub wall_ms: u64,
    pub concurrency: usize,
    pub target_ms: u64,
}

/// `None` when no request completed
pub fn compute_metrics(burst: &Burst<'_>) -> Option<PerformanceMetric> {
    if burst.latencies.is_empty() {
        return None;
    }
    let mut sorted = burst.latencies.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let average_ms = sorted.iter().sum::<u64>() as f64 / n as f64;
    let wall_ms = burst.wall_ms.max(1);

    Some(PerformanceMetric {
        method: burst.method,
        path: burst.path.to_string(),
        concurrency: burst.concurrency,
        completed: n,
        errors: burst.errors,
        average_ms,
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
        p95_ms: percentile(&sorted, 0.95),
        p99_ms: percentile(&sorted, 0.99),
        requests_per_second: burst.concurrency as f64 / wall_ms as f64 * 1000.0,
        over_target: sorted.iter().filter(|l| **l > burst.target_ms).count(),
        status: SpeedClass::classify(average_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(latencies: &[u64], wall_ms: u64) -> Burst<'_> {
        Burst {
            method: HttpMethod::Get,
            path: "/a",
            latencies,
            errors: 0,
            wall_ms,
            concurrency: 20,
            target_ms: 500,
        }
    }

    #[test]
    fn test_identical_latencies() {
        let latencies = [100u64; 20];
        let metric = compute_metrics(&burst(&latencies, 100)).unwrap();
        assert_eq!(metric.p95_ms, 100);
        assert_eq!(metric.p99_ms, 100);
        assert_eq!(metric.average_ms, 100.0);
        assert_eq!(metric.status, SpeedClass::Fast);
        assert_eq!(metric.requests_per_second, 200.0);
        assert_eq!(metric.over_target, 0);
    }

    #[test]
    fn test_percentile_indices() {
        // 20 samples: floor(19.0) = 19, floor(19.8) = 19
        let latencies: Vec<u64> = (1..=20).rev().map(|i| i * 50).collect();
        let metric = compute_metrics(&burst(&latencies, 1000)).unwrap();
        assert_eq!(metric.min_ms, 50);
        assert_eq!(metric.max_ms, 1000);
        assert_eq!(metric.p95_ms, 1000);
        assert_eq!(metric.p99_ms, 1000);
        assert_eq!(metric.average_ms, 525.0);
        assert_eq!(metric.status, SpeedClass::Slow);
        assert_eq!(metric.over_target, 10);
        assert_eq!(metric.requests_per_second, 20.0);

        let sorted: Vec<u64> = (0..100).collect();
        assert_eq!(percentile(&sorted, 0.95), 95);
        assert_eq!(percentile(&sorted, 0.99), 99);
        assert_eq!(percentile(&[7], 0.99), 7);
    }

    #[test]
    fn test_no_completed_requests() {
        assert!(compute_metrics(&burst(&[], 10)).is_none());
    }
}
