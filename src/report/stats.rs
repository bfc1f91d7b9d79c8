//! Descriptive statistics over the sample sequence.
//!
//! [`summarize`] is a pure function of the samples: recomputing it from a
//! loaded report reproduces the stored summary exactly, which is what makes
//! offline re-analysis trustworthy.
//!
//! Percentiles use the nearest-rank method (1-based rank `ceil(p/100 * n)`
//! over the sorted ok-latencies): the reported p95/p99 is always a latency
//! that was actually observed, which is the honest claim at the low sample
//! counts a one-shot run collects. Interpolated percentiles would differ by
//! a few percent here.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::report::model::{Sample, TestType};

/// Distribution statistics over the ok subset, all in milliseconds.
///
/// `std_dev` is the population standard deviation (divide by `n`, not
/// `n - 1`): the sample set is the entire population of this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Per-test-type partition of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    /// Samples of this type regardless of outcome.
    pub attempted: u64,
    pub ok_count: u64,
    /// `ok / attempted`; 0.0 when nothing of this type was attempted.
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LatencyStats>,
}

/// Derived statistics stored alongside the raw samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_samples: u64,
    pub ok_count: u64,
    pub timeout_count: u64,
    pub error_count: u64,
    /// `ok / total`; 0.0 for an empty sample set rather than a division
    /// fault.
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<LatencyStats>,
    pub file: TypeSummary,
    pub directory: TypeSummary,
}

/// Compute the summary for a sample sequence.
///
/// Total over all inputs: empty and all-timeout sets yield zeroed counts
/// and absent stats blocks.
#[must_use]
pub fn summarize(samples: &[Sample]) -> Summary {
    let total = samples.len() as u64;
    let ok_count = samples.iter().filter(|s| s.is_ok()).count() as u64;
    let timeout_count = samples
        .iter()
        .filter(|s| matches!(s.outcome, crate::report::model::Outcome::Timeout))
        .count() as u64;
    let error_count = total - ok_count - timeout_count;

    let mut overall_latencies: Vec<f64> = samples.iter().filter_map(|s| s.latency_ms).collect();

    Summary {
        total_samples: total,
        ok_count,
        timeout_count,
        error_count,
        success_rate: rate(ok_count, total),
        overall: latency_stats(&mut overall_latencies),
        file: type_summary(samples, TestType::File),
        directory: type_summary(samples, TestType::Directory),
    }
}

fn type_summary(samples: &[Sample], test_type: TestType) -> TypeSummary {
    let partition: Vec<&Sample> = samples.iter().filter(|s| s.test_type == test_type).collect();
    let attempted = partition.len() as u64;
    let ok_count = partition.iter().filter(|s| s.is_ok()).count() as u64;
    let mut latencies: Vec<f64> = partition.iter().filter_map(|s| s.latency_ms).collect();

    TypeSummary {
        attempted,
        ok_count,
        success_rate: rate(ok_count, attempted),
        stats: latency_stats(&mut latencies),
    }
}

fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Distribution statistics over a latency set. Sorts in place; `None` for
/// an empty set.
fn latency_stats(latencies: &mut Vec<f64>) -> Option<LatencyStats> {
    if latencies.is_empty() {
        return None;
    }
    latencies.sort_by(f64::total_cmp);

    let count = latencies.len();
    let mean = latencies.iter().sum::<f64>() / count as f64;
    let variance = latencies.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    Some(LatencyStats {
        count: count as u64,
        mean,
        median: median_sorted(latencies),
        std_dev: variance.sqrt(),
        min: latencies[0],
        max: latencies[count - 1],
        p95: percentile_sorted(latencies, 95.0),
        p99: percentile_sorted(latencies, 99.0),
    })
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
    }
}

/// Nearest-rank percentile over a pre-sorted slice: 1-based rank
/// `ceil(pct/100 * n)`, clamped into the observed range.
fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    let rank = ((pct / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}
