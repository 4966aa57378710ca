//! Terminal output of session aggregates
//!
//! `format_*` build the lines, `display_*` print them. Latencies are shown in
//! milliseconds.

// Unit conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use atop_common::{
    BenchmarkStats, CpuUtilization, InteractionCounts, IoctlBreakdown, LatencyCategory,
};

use crate::domain::Framework;
use crate::session::Session;

/// Milliseconds for one category.
///
/// TFLite offload is a nanosecond total over all runs; everything else is
/// already a per-run microsecond value.
#[must_use]
pub fn latency_ms(
    stats: &BenchmarkStats,
    category: LatencyCategory,
    framework: Framework,
    runs: u32,
) -> f64 {
    let value = stats.get(category) as f64;
    if framework.is_tflite() && category == LatencyCategory::Offload {
        value / f64::from(runs.max(1)) / 1.0e6
    } else {
        value / 1.0e3
    }
}

#[must_use]
pub fn format_benchmark_summary(
    stats: &BenchmarkStats,
    framework: Framework,
    runs: u32,
) -> Vec<String> {
    LatencyCategory::ALL
        .iter()
        .map(|&c| format!("{c}: {:.3} ms", latency_ms(stats, c, framework, runs)))
        .collect()
}

/// Per-run average of each command.
#[must_use]
pub fn format_breakdown(breakdown: &IoctlBreakdown, runs: u32) -> Vec<String> {
    let runs = f64::from(runs.max(1));
    let mut lines = Vec::new();
    for (app, commands) in breakdown {
        lines.push(format!("{app}:"));
        for (cmd, &count) in commands {
            lines.push(format!("\t{cmd}: {}", f64::from(count) / runs));
        }
    }
    lines
}

/// Non-zero tags only; `current (peak)`.
#[must_use]
pub fn format_interactions(current: &InteractionCounts, peak: &InteractionCounts) -> String {
    let parts: Vec<String> = peak
        .iter()
        .filter(|(_, &max)| max > 0)
        .map(|(tag, max)| format!("{tag}={} ({max})", current.get(tag).copied().unwrap_or(0)))
        .collect();
    if parts.is_empty() {
        "no accelerator activity".to_string()
    } else {
        parts.join(" ")
    }
}

#[must_use]
pub fn format_cpu(cpu: &CpuUtilization) -> String {
    cpu.iter().map(|(core, pct)| format!("{core}={pct:.0}%")).collect::<Vec<_>>().join(" ")
}

/// One status line per poll cycle
pub fn display_status(session: &Session, elapsed_secs: u64) {
    println!(
        "[{elapsed_secs:>4}s] {} | {}",
        format_interactions(session.interactions(), session.max_interactions()),
        format_cpu(session.cpu())
    );
}

/// Benchmark summary and breakdown
pub fn display_benchmark_summary(session: &Session) {
    println!("\nBenchmark Summary ({}, {} runs)", session.framework(), session.runs());
    for line in format_benchmark_summary(session.stats(), session.framework(), session.runs()) {
        println!("  {line}");
    }

    let breakdown = format_breakdown(session.breakdown(), session.runs());
    if !breakdown.is_empty() {
        println!("Breakdown");
        for line in breakdown {
            println!("  {line}");
        }
    }
}
