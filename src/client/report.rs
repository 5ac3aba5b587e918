//! Printable batch report.

use crate::client::result::LatencyResult;
use crate::client::stats::BatchSummary;
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

const SUB_MILLISECOND_NS: u64 = 1_000_000;

/// Results of one batch plus their summary.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Local>,
    /// Per-request results in issue order.
    pub results: Vec<LatencyResult>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(started_at: DateTime<Local>, results: Vec<LatencyResult>, duration: Duration) -> Self {
        let summary = BatchSummary::from_results(&results, duration);
        Self {
            started_at,
            results,
            summary,
        }
    }
}

fn micros(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = &self.summary;

        writeln!(f, "=== Test Results ===")?;
        writeln!(f, "Started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S%.3f"))?;
        writeln!(f, "Test Duration: {} ms", summary.duration.as_millis())?;
        writeln!(f, "Total Requests: {}", summary.total)?;
        writeln!(f, "Successful: {}", summary.successful)?;
        writeln!(f, "Failed: {}", summary.failed)?;
        match summary.success_rate() {
            Some(rate) => writeln!(f, "Success Rate: {rate:.2}%")?,
            None => writeln!(f, "Success Rate: n/a")?,
        }

        if !summary.failures.is_empty() {
            writeln!(f, "\nFailures:")?;
            for (message, count) in &summary.failures {
                writeln!(f, "  {count} x {message}")?;
            }
        }

        let Some(stats) = summary.stats else {
            return writeln!(f, "\nNo successful requests, latency statistics unavailable");
        };

        writeln!(f, "\nLatency Statistics:")?;
        writeln!(f, "  Min: {:.3} μs", micros(stats.min_ns))?;
        writeln!(f, "  Max: {:.3} μs", micros(stats.max_ns))?;
        writeln!(f, "  Avg: {:.3} μs", micros(stats.avg_ns))?;
        for (label, ns) in stats.percentiles() {
            writeln!(f, "  {label}: {:.3} μs", micros(ns))?;
        }

        if let Some(rps) = summary.throughput_rps() {
            writeln!(f, "\nPerformance Metrics:")?;
            writeln!(f, "  Throughput: {rps:.1} req/sec")?;
        }

        if stats.min_ns < SUB_MILLISECOND_NS {
            writeln!(f, "\nSub-millisecond latency achieved")?;
            writeln!(f, "  Best latency: {:.3} μs", micros(stats.min_ns))?;
        }

        Ok(())
    }
}
