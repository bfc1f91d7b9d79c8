//! Plain-text rendering: statistics tables and ASCII latency charts.
//!
//! Replaces the original chart output with terminal-native text so reports
//! render anywhere the CLI runs. Color is applied by the CLI layer, not
//! here.

use std::fmt::Write as _;

use crate::report::model::{Report, Sample};
use crate::report::stats::{LatencyStats, TypeSummary};

/// Percentile points reported in the cumulative-distribution table.
const CDF_POINTS: [f64; 6] = [50.0, 75.0, 90.0, 95.0, 99.0, 100.0];

/// Caveat printed under every stats block: the per-check exec round-trip
/// into the container inflates every measured latency.
pub const OVERHEAD_CAVEAT: &str =
    "note: latencies include the container exec round-trip per visibility check; \
     treat values as upper bounds on mount propagation delay";

/// Render the full human-readable results block for a report.
#[must_use]
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "MOUNT VISIBILITY TEST RESULTS");
    let _ = writeln!(out, "=============================");
    let _ = writeln!(
        out,
        "run: {}  image: {}  environments: {}",
        report.metadata.timestamp, report.test_config.image, report.test_config.num_environments
    );
    let _ = writeln!(
        out,
        "samples: {} ({} ok, {} timeout, {} error)  success rate: {:.1}%",
        summary.total_samples,
        summary.ok_count,
        summary.timeout_count,
        summary.error_count,
        summary.success_rate * 100.0
    );
    out.push('\n');

    match &summary.overall {
        Some(stats) => {
            out.push_str(&render_stats_block("OVERALL", stats));
        }
        None => {
            let _ = writeln!(out, "OVERALL: no successful samples");
        }
    }
    out.push('\n');
    out.push_str(&render_type_block("FILE OPERATIONS", &summary.file));
    out.push('\n');
    out.push_str(&render_type_block("DIRECTORY OPERATIONS", &summary.directory));
    out.push('\n');
    let _ = writeln!(out, "{OVERHEAD_CAVEAT}");
    out
}

fn render_type_block(title: &str, partition: &TypeSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{title}: {} attempted, {} ok ({:.1}% success)",
        partition.attempted,
        partition.ok_count,
        partition.success_rate * 100.0
    );
    if let Some(stats) = &partition.stats {
        out.push_str(&render_stats_block("", stats));
    }
    out
}

fn render_stats_block(title: &str, stats: &LatencyStats) -> String {
    let mut out = String::new();
    if !title.is_empty() {
        let _ = writeln!(out, "{title}:");
    }
    let _ = writeln!(out, "  count:   {}", stats.count);
    let _ = writeln!(out, "  mean:    {:.3} ms", stats.mean);
    let _ = writeln!(out, "  median:  {:.3} ms", stats.median);
    let _ = writeln!(out, "  std dev: {:.3} ms", stats.std_dev);
    let _ = writeln!(out, "  min:     {:.3} ms", stats.min);
    let _ = writeln!(out, "  max:     {:.3} ms", stats.max);
    let _ = writeln!(out, "  p95:     {:.3} ms", stats.p95);
    let _ = writeln!(out, "  p99:     {:.3} ms", stats.p99);
    out
}

/// Render the latency distribution charts: histogram plus cumulative table.
///
/// Empty when there are no successful samples to plot.
#[must_use]
pub fn render_charts(samples: &[Sample]) -> String {
    let mut latencies: Vec<f64> = samples.iter().filter_map(|s| s.latency_ms).collect();
    if latencies.is_empty() {
        return String::new();
    }
    latencies.sort_by(f64::total_cmp);

    let mut out = String::new();
    out.push_str("LATENCY DISTRIBUTION\n");
    out.push_str(&histogram(&latencies, 12, 40));
    out.push('\n');
    out.push_str("CUMULATIVE DISTRIBUTION\n");
    out.push_str(&cumulative_table(&latencies));
    out
}

/// Fixed-width ASCII histogram over `bins` equal-width buckets.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn histogram(sorted: &[f64], bins: usize, width: usize) -> String {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let span = (max - min).max(f64::EPSILON);
    let bin_width = span / bins as f64;

    let mut counts = vec![0_usize; bins];
    for &v in sorted {
        let idx = (((v - min) / bin_width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let peak = counts.iter().copied().max().unwrap_or(1).max(1);

    let mut out = String::new();
    for (i, &count) in counts.iter().enumerate() {
        let lo = (i as f64).mul_add(bin_width, min);
        let hi = lo + bin_width;
        let bar_len = (count * width).div_ceil(peak);
        let bar: String = "#".repeat(if count == 0 { 0 } else { bar_len.max(1) });
        let _ = writeln!(out, "  {lo:>9.3}-{hi:<9.3} ms |{bar:<width$}| {count}");
    }
    out
}

fn cumulative_table(sorted: &[f64]) -> String {
    let n = sorted.len();
    let mut out = String::new();
    for pct in CDF_POINTS {
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let rank = (((pct / 100.0) * n as f64).ceil() as usize).clamp(1, n);
        let _ = writeln!(out, "  p{pct:<5} <= {:.3} ms", sorted[rank - 1]);
    }
    out
}
