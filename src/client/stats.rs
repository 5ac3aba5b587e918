//! Summary statistics over a batch of results.

use crate::client::result::LatencyResult;
use std::collections::BTreeMap;
use std::time::Duration;

/// Reported percentiles as (label, fraction in thousandths).
///
/// Thousandths keep `floor(n * p)` exact for P99.9 without going through
/// floating point.
pub const PERCENTILES: [(&str, u64); 4] = [("P50", 500), ("P95", 950), ("P99", 990), ("P99.9", 999)];

/// Index of the `per_mille` percentile in a sorted sequence of `n` values:
/// `floor(n * p)`, clamped to the last element. `None` for empty data.
pub fn percentile_index(n: usize, per_mille: u64) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let idx = (n as u128 * per_mille as u128 / 1000) as usize;
    Some(idx.min(n - 1))
}

/// Latency cut points over the successful requests of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub min_ns: u64,
    pub max_ns: u64,
    pub avg_ns: u64,
    pub p50_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
}

impl LatencyStats {
    /// Compute stats from an ascending sequence. `None` if it is empty.
    pub fn from_sorted(sorted: &[u64]) -> Option<Self> {
        let (&min_ns, &max_ns) = (sorted.first()?, sorted.last()?);
        let total: u128 = sorted.iter().map(|&ns| ns as u128).sum();
        let at = |per_mille| percentile_index(sorted.len(), per_mille).map(|i| sorted[i]);

        Some(Self {
            min_ns,
            max_ns,
            avg_ns: (total / sorted.len() as u128) as u64,
            p50_ns: at(PERCENTILES[0].1)?,
            p95_ns: at(PERCENTILES[1].1)?,
            p99_ns: at(PERCENTILES[2].1)?,
            p999_ns: at(PERCENTILES[3].1)?,
        })
    }

    /// Percentile values in the order of `PERCENTILES`.
    pub fn percentiles(&self) -> [(&'static str, u64); 4] {
        [
            (PERCENTILES[0].0, self.p50_ns),
            (PERCENTILES[1].0, self.p95_ns),
            (PERCENTILES[2].0, self.p99_ns),
            (PERCENTILES[3].0, self.p999_ns),
        ]
    }
}

/// Read-only view over the results of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Latencies of successful requests, ascending.
    pub latencies_ns: Vec<u64>,
    /// Wall-clock duration of the whole batch.
    pub duration: Duration,
    /// `None` when no request succeeded.
    pub stats: Option<LatencyStats>,
    /// Failure messages and how often each occurred.
    pub failures: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn from_results(results: &[LatencyResult], duration: Duration) -> Self {
        let mut latencies_ns = Vec::with_capacity(results.len());
        let mut failures = BTreeMap::new();

        for result in results {
            if result.is_success() {
                latencies_ns.push(result.latency_ns);
            } else {
                *failures.entry(result.error_message()).or_insert(0) += 1;
            }
        }

        latencies_ns.sort_unstable();
        let stats = LatencyStats::from_sorted(&latencies_ns);
        let successful = latencies_ns.len();

        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            latencies_ns,
            duration,
            stats,
            failures,
        }
    }

    /// Percentage of successful requests, `None` for an empty batch.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successful as f64 * 100.0 / self.total as f64)
    }

    /// Successful requests per second of wall-clock time.
    pub fn throughput_rps(&self) -> Option<f64> {
        let secs = self.duration.as_secs_f64();
        (self.successful > 0 && secs > 0.0).then(|| self.successful as f64 / secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;

    fn successes(latencies: &[u64]) -> Vec<LatencyResult> {
        latencies
            .iter()
            .map(|&ns| LatencyResult::success(ns, "respuesta".to_string()))
            .collect()
    }

    #[test]
    fn test_percentile_index_bounds() {
        assert_eq!(percentile_index(0, 500), None);
        for n in 1..=2000 {
            for (_, per_mille) in PERCENTILES {
                let idx = percentile_index(n, per_mille).unwrap();
                assert!(idx < n, "n={n} p={per_mille} idx={idx}");
            }
        }
    }

    #[test]
    fn test_percentile_index_floor() {
        assert_eq!(percentile_index(1, 999), Some(0));
        assert_eq!(percentile_index(10, 500), Some(5));
        assert_eq!(percentile_index(20, 950), Some(19));
        assert_eq!(percentile_index(100, 990), Some(99));
        assert_eq!(percentile_index(1000, 999), Some(999));
        assert_eq!(percentile_index(2000, 999), Some(1998));
    }

    #[test]
    fn test_empty_batch() {
        let summary = BatchSummary::from_results(&[], Duration::ZERO);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.successful, 0);
        assert!(summary.stats.is_none());
        assert!(summary.success_rate().is_none());
        assert!(summary.throughput_rps().is_none());
    }

    #[test]
    fn test_stats_ordering() {
        let results = successes(&[900, 100, 500, 300, 700, 200, 800, 400, 600, 1000]);
        let summary = BatchSummary::from_results(&results, Duration::from_millis(10));
        let stats = summary.stats.unwrap();

        assert!(summary.latencies_ns.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(stats.min_ns, 100);
        assert_eq!(stats.max_ns, 1000);
        assert_eq!(stats.avg_ns, 550);
        assert_eq!(stats.p50_ns, 600);
        assert!(stats.min_ns <= stats.p50_ns);
        assert!(stats.p50_ns <= stats.p95_ns);
        assert!(stats.p95_ns <= stats.p99_ns);
        assert!(stats.p99_ns <= stats.p999_ns);
        assert!(stats.p999_ns <= stats.max_ns);
    }

    #[test]
    fn test_failures_excluded_from_latencies() {
        let mut results = successes(&[100, 200]);
        results.push(LatencyResult::mismatch(50, "respuesta", "nope".to_string()));
        results.push(LatencyResult::failure(RequestError::SendFailed));
        results.push(LatencyResult::failure(RequestError::SendFailed));

        let summary = BatchSummary::from_results(&results, Duration::from_secs(1));
        assert_eq!(summary.total, 5);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.successful + summary.failed, summary.total);
        assert_eq!(summary.latencies_ns, vec![100, 200]);
        assert_eq!(summary.stats.unwrap().min_ns, 100);
        assert_eq!(summary.failures.get("Failed to send request"), Some(&2));
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.success_rate(), Some(40.0));
        assert_eq!(summary.throughput_rps(), Some(2.0));
    }

    #[test]
    fn test_single_sample() {
        let summary = BatchSummary::from_results(&successes(&[42]), Duration::from_millis(1));
        let stats = summary.stats.unwrap();
        assert_eq!(stats.percentiles().map(|(_, ns)| ns), [42, 42, 42, 42]);
    }
}
