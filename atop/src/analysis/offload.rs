//! Kernel/driver offload estimation.
//!
//! The instrumented drivers log how long a benchmark process spent inside
//! them. Three sources are understood, each summed over the benchmark's own
//! lines and folded into `BenchmarkStats::offload` as nanoseconds:
//!
//! | Estimator | Source | Line shape | Delta |
//! |---|---|---|---|
//! | `update_kernel_offload` | dmesg TIME | `TIME adsprpc: (app: P) (ioctl\|invoke) <secs>` | Σioctl − Σinvoke |
//! | `update_kernel_gpu_offload` | dmesg IOCTL | `IOCTL kgsl: (app: P) ... (time: <secs>)` | Σtime |
//! | `update_driver_offload` | logcat | `(app: P) (driver) <secs>` | Σdriver |

use log::{debug, warn};
use regex::Regex;

use atop_common::BenchmarkStats;

use crate::domain::AtopError;

/// Process names (prefixes) whose driver time is attributed to the benchmark.
pub const BENCHMARK_PROCESSES: [&str; 4] =
    ["benchmark_model", "snpe-net-run", "tflite_app", "org.tensorflow."];

const SECONDS: &str = r"([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)";
const NANOS_PER_SEC: f64 = 1e9;

/// Outcome of one estimator call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffloadUpdate {
    /// Nanoseconds added to `offload`.
    Applied(u64),
    /// The delta (seconds) came out negative; stats left alone.
    Negative(f64),
    /// No line from a benchmark process.
    NoSamples,
}

#[must_use]
pub fn is_benchmark_process(name: &str) -> bool {
    let name = name.trim();
    BENCHMARK_PROCESSES.iter().any(|p| name.starts_with(p))
}

/// Offload estimators; patterns compiled once.
#[derive(Debug, Clone)]
pub struct OffloadEstimator {
    time_line: Regex,
    gpu_line: Regex,
    driver_line: Regex,
}

impl OffloadEstimator {
    /// # Errors
    /// Pattern compilation failure.
    pub fn new() -> Result<Self, AtopError> {
        Ok(Self {
            time_line: Regex::new(&format!(
                r"TIME\s+[A-Za-z0-9_-]+:\s*\(app:\s*([^)]*?)\s*\)\s*\((ioctl|invoke)\)\s*{SECONDS}"
            ))?,
            gpu_line: Regex::new(&format!(
                r"IOCTL\s+kgsl:\s*\(app:\s*([^)]*?)\s*\).*\(time:\s*{SECONDS}\s*\)"
            ))?,
            driver_line: Regex::new(&format!(
                r"\(app:\s*([^)]*?)\s*\)\s*\(driver\)\s*{SECONDS}"
            ))?,
        })
    }

    /// Σioctl − Σinvoke over dmesg TIME lines.
    pub fn update_kernel_offload<S: AsRef<str>>(
        &self,
        lines: &[S],
        stats: &mut BenchmarkStats,
    ) -> OffloadUpdate {
        let mut samples = 0usize;
        let mut delta = 0.0;
        for line in lines {
            let Some(caps) = self.time_line.captures(line.as_ref()) else {
                continue;
            };
            if !is_benchmark_process(&caps[1]) {
                continue;
            }
            let Ok(secs) = caps[3].parse::<f64>() else {
                continue;
            };
            samples += 1;
            if &caps[2] == "ioctl" {
                delta += secs;
            } else {
                delta -= secs;
            }
        }
        apply("kernel", samples, delta, stats)
    }

    /// Σtime over kgsl IOCTL lines.
    pub fn update_kernel_gpu_offload<S: AsRef<str>>(
        &self,
        lines: &[S],
        stats: &mut BenchmarkStats,
    ) -> OffloadUpdate {
        let (samples, delta) = sum_seconds(&self.gpu_line, lines);
        apply("gpu", samples, delta, stats)
    }

    /// Σdriver over logcat driver timing lines.
    pub fn update_driver_offload<S: AsRef<str>>(
        &self,
        lines: &[S],
        stats: &mut BenchmarkStats,
    ) -> OffloadUpdate {
        let (samples, delta) = sum_seconds(&self.driver_line, lines);
        apply("driver", samples, delta, stats)
    }
}

/// Sum group 2 over lines whose group 1 is a benchmark process.
fn sum_seconds<S: AsRef<str>>(pattern: &Regex, lines: &[S]) -> (usize, f64) {
    lines
        .iter()
        .filter_map(|line| pattern.captures(line.as_ref()))
        .filter(|caps| is_benchmark_process(&caps[1]))
        .filter_map(|caps| caps[2].parse::<f64>().ok())
        .fold((0, 0.0), |(n, sum), secs| (n + 1, sum + secs))
}

fn apply(source: &str, samples: usize, delta: f64, stats: &mut BenchmarkStats) -> OffloadUpdate {
    if samples == 0 {
        return OffloadUpdate::NoSamples;
    }
    if delta < 0.0 {
        warn!("Negative {source} offload ({delta} s over {samples} samples), ignoring");
        return OffloadUpdate::Negative(delta);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = (delta * NANOS_PER_SEC).round() as u64;
    stats.offload = stats.offload.saturating_add(nanos);
    debug!("{source} offload +{nanos} ns from {samples} samples");
    OffloadUpdate::Applied(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> OffloadEstimator {
        OffloadEstimator::new().unwrap()
    }

    #[test]
    fn test_kernel_offload_ioctl_minus_invoke() {
        let lines = [
            "[10.0] TIME adsprpc: (app: benchmark_model) (ioctl) 0.004",
            "[10.1] TIME adsprpc: (app: benchmark_model) (invoke) 0.001",
            "[10.2] TIME adsprpc: (app: surfaceflinger) (ioctl) 5.0",
        ];
        let mut stats = BenchmarkStats::default();
        let update = estimator().update_kernel_offload(&lines, &mut stats);
        assert_eq!(update, OffloadUpdate::Applied(3_000_000));
        assert_eq!(stats.offload, 3_000_000);
    }

    #[test]
    fn test_negative_offload_leaves_stats() {
        let lines = [
            "[1.0] TIME adsprpc: (app: benchmark_model) (ioctl) 0.001",
            "[1.1] TIME adsprpc: (app: benchmark_model) (invoke) 0.003",
        ];
        let mut stats = BenchmarkStats {
            offload: 42,
            ..BenchmarkStats::default()
        };
        let update = estimator().update_kernel_offload(&lines, &mut stats);
        assert!(matches!(update, OffloadUpdate::Negative(d) if d < 0.0));
        assert_eq!(stats.offload, 42);
    }

    #[test]
    fn test_gpu_offload() {
        let lines = [
            "[2.0] IOCTL kgsl: (app: org.tensorflow.lite.benchmark) (cmd: IOCTL_KGSL_GPU_COMMAND [74]) (time: 0.0005)",
            "[2.1] IOCTL kgsl: (app: benchmark_model) (cmd: IOCTL_KGSL_GPUOBJ_SYNC [72]) (time: 0.0015)",
            "[2.2] IOCTL kgsl: (app: launcher) (cmd: X [1]) (time: 1.0)",
            "[2.3] IOCTL vidioc: (app: benchmark_model) (cmd: X [1]) (time: 1.0)",
        ];
        let mut stats = BenchmarkStats::default();
        assert_eq!(
            estimator().update_kernel_gpu_offload(&lines, &mut stats),
            OffloadUpdate::Applied(2_000_000)
        );
    }

    #[test]
    fn test_driver_offload_accumulates() {
        let lines = ["05-13 23:23:08.123  1 2 V ExecutionBuilder: (app: tflite_app) (driver) 2e-3"];
        let est = estimator();
        let mut stats = BenchmarkStats::default();
        est.update_driver_offload(&lines, &mut stats);
        est.update_driver_offload(&lines, &mut stats);
        assert_eq!(stats.offload, 4_000_000);
    }

    #[test]
    fn test_no_samples() {
        let mut stats = BenchmarkStats::default();
        let lines: [&str; 1] = ["[1.0] INFO: (app: benchmark_model) nothing timed"];
        assert_eq!(estimator().update_kernel_offload(&lines, &mut stats), OffloadUpdate::NoSamples);
        assert_eq!(estimator().update_driver_offload(&lines, &mut stats), OffloadUpdate::NoSamples);
        assert_eq!(stats.offload, 0);
    }

    #[test]
    fn test_benchmark_process_filter() {
        assert!(is_benchmark_process("benchmark_model"));
        assert!(is_benchmark_process(" snpe-net-run "));
        assert!(is_benchmark_process("org.tensorflow.lite.benchmark"));
        assert!(!is_benchmark_process("surfaceflinger"));
    }
}
