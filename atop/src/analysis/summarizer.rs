//! Benchmark output summarization.
//!
//! Turns the textual output of a benchmark session into [`BenchmarkStats`].
//! Two output dialects are understood:
//!
//! # `benchmark_model` report (TFLite tool and TFLite benchmark app)
//!
//! ```text
//! PRE-PROCESSING done 1500
//! Inference timings in us: Init: 2000, First inference: 9000, Inference (avg): 5000
//! ```
//!
//! # `snpe-diagview` report (SNPE)
//!
//! ```text
//! Dnn Runtime Load/Deserialize/Create Statistics:     <- section start
//! Init: 62546 us
//! Forward Propagate Time: 9876 us
//! RPC Execute Time: 8000 us
//! Accelerator Time: 5000 us
//! Layer Times:                                        <- section end
//! ```
//!
//! Diagview values are summed per label over every section and averaged by
//! the number of sections (one per run).

use log::debug;
use regex::Regex;
use std::collections::HashMap;

use atop_common::BenchmarkStats;

use crate::domain::{AtopError, Framework};

// =============================================================================
// CONSTANTS
// =============================================================================

const PREPROC_PREAMBLE: &str = "PRE-PROCESSING";
const TIMINGS_PREAMBLE: &str = "Inference timings in us:";
const TIMINGS_PATTERN: &str = r"Init: (\d+)(?:\.\d+)?,.*Inference \(avg\): (\d+)(?:\.\d+)?";

const DIAG_SECTION_START: &str = "Dnn Runtime Load/Deserialize/Create Statistics:";
const DIAG_SECTION_END: &str = "Layer Times:";
const DIAG_ENTRY_PATTERN: &str = r"^\s*([A-Za-z][A-Za-z0-9 /()_-]*?)\s*:\s*(\d+)\s*us\s*$";

const FORWARD_PROPAGATE: &str = "Forward Propagate Time";
const RPC_EXECUTE: &str = "RPC Execute Time";
const ACCELERATOR: &str = "Accelerator Time";
const INIT: &str = "Init";

// =============================================================================
// SUMMARIZER
// =============================================================================

/// Parses benchmark output into latency categories.
///
/// Patterns are compiled once at construction.
#[derive(Debug, Clone)]
pub struct BenchmarkSummarizer {
    timings: Regex,
    diag_entry: Regex,
}

impl BenchmarkSummarizer {
    /// # Errors
    /// Pattern compilation failure.
    pub fn new() -> Result<Self, AtopError> {
        Ok(Self {
            timings: Regex::new(TIMINGS_PATTERN)?,
            diag_entry: Regex::new(DIAG_ENTRY_PATTERN)?,
        })
    }

    /// Fold `output` into `stats` according to `framework`'s output format.
    ///
    /// Lines that do not parse are skipped. A `benchmark_model` report only
    /// touches the categories it finds; a diagview report overwrites the whole
    /// breakdown. `runs` is the run count of the session, over which the
    /// accumulated offload is spread.
    ///
    /// # Errors
    /// `AtopError::NotImplemented` for frameworks without a known format.
    pub fn summarize<S: AsRef<str>>(
        &self,
        output: &[S],
        framework: Framework,
        runs: u32,
        stats: &mut BenchmarkStats,
    ) -> Result<(), AtopError> {
        match framework {
            Framework::TfLite | Framework::TfLiteApp => {
                self.summarize_tflite(output, runs, stats);
                Ok(())
            }
            Framework::Snpe => {
                self.summarize_diagview(output, stats);
                Ok(())
            }
            Framework::MlPerf => Err(AtopError::NotImplemented(format!("Framework {framework}"))),
        }
    }

    fn summarize_tflite<S: AsRef<str>>(&self, output: &[S], runs: u32, stats: &mut BenchmarkStats) {
        for line in output {
            let line = line.as_ref().trim();

            if let Some(rest) = line.strip_prefix(PREPROC_PREAMBLE) {
                match rest.split_whitespace().find_map(|tok| tok.parse::<u64>().ok()) {
                    Some(v) => stats.preproc = v,
                    None => debug!("no pre-processing value in {line:?}"),
                }
            } else if line.starts_with(TIMINGS_PREAMBLE) {
                let Some(caps) = self.timings.captures(line) else {
                    debug!("unrecognised timing line {line:?}");
                    continue;
                };
                let (Ok(init), Ok(inference)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>())
                else {
                    debug!("timing value out of range in {line:?}");
                    continue;
                };
                stats.init = init;
                // Offload is a nanosecond total over all runs; inference is a
                // per-run average in microseconds.
                let offload_per_run_us = stats.offload / u64::from(runs.max(1)) / 1000;
                stats.inference = inference.saturating_sub(offload_per_run_us);
            }
        }
    }

    fn summarize_diagview<S: AsRef<str>>(&self, output: &[S], stats: &mut BenchmarkStats) {
        let mut totals: HashMap<String, u64> = HashMap::new();
        let mut sections = 0u64;
        let mut in_section = false;

        for line in output {
            let line = line.as_ref().trim();

            if line.starts_with(DIAG_SECTION_START) {
                sections += 1;
                in_section = true;
                continue;
            }
            if line.starts_with(DIAG_SECTION_END) {
                in_section = false;
                continue;
            }
            if !in_section {
                continue;
            }

            let Some(caps) = self.diag_entry.captures(line) else {
                continue;
            };
            let Ok(value) = caps[2].parse::<u64>() else {
                debug!("diagview value out of range in {line:?}");
                continue;
            };
            *totals.entry(caps[1].to_string()).or_default() += value;
        }

        let divisor = sections.max(1);
        let avg = |label: &str| totals.get(label).copied().unwrap_or(0) / divisor;

        let forward = avg(FORWARD_PROPAGATE);
        let rpc = avg(RPC_EXECUTE);
        let accelerator = avg(ACCELERATOR);

        stats.preproc = 0;
        stats.postproc = 0;
        stats.inference = forward;
        stats.offload = rpc.saturating_sub(accelerator);
        stats.delegation = forward.saturating_sub(rpc);
        stats.init = avg(INIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(output: &[&str], framework: Framework, stats: &mut BenchmarkStats) {
        BenchmarkSummarizer::new().unwrap().summarize(output, framework, 1, stats).unwrap();
    }

    #[test]
    fn test_tflite_format() {
        let mut stats = BenchmarkStats::default();
        summarize(
            &[
                "PRE-PROCESSING done 1500",
                "Inference timings in us: Init: 2000, First inference: 9000, \
                 Warmup (avg): 6000.5, Inference (avg): 5000",
            ],
            Framework::TfLite,
            &mut stats,
        );
        assert_eq!(stats.preproc, 1500);
        assert_eq!(stats.init, 2000);
        assert_eq!(stats.inference, 5000);
        assert_eq!(stats.postproc, 0);
    }

    #[test]
    fn test_tflite_fractional_values_truncated() {
        let mut stats = BenchmarkStats::default();
        summarize(
            &["Inference timings in us: Init: 2000.75, Inference (avg): 4321.9"],
            Framework::TfLiteApp,
            &mut stats,
        );
        assert_eq!(stats.init, 2000);
        assert_eq!(stats.inference, 4321);
    }

    #[test]
    fn test_tflite_inference_excludes_known_offload() {
        let mut stats = BenchmarkStats {
            offload: 3_000_000,
            ..BenchmarkStats::default()
        };
        summarize(
            &["Inference timings in us: Init: 10, Inference (avg): 5000"],
            Framework::TfLite,
            &mut stats,
        );
        assert_eq!(stats.inference, 2000);
        assert_eq!(stats.offload, 3_000_000);

        let mut stats = BenchmarkStats {
            offload: 9_000_000,
            ..BenchmarkStats::default()
        };
        summarize(
            &["Inference timings in us: Init: 10, Inference (avg): 5000"],
            Framework::TfLite,
            &mut stats,
        );
        assert_eq!(stats.inference, 0);
    }

    #[test]
    fn test_tflite_offload_spread_over_runs() {
        let summarizer = BenchmarkSummarizer::new().unwrap();
        // 8 ms over 4 runs is 2 ms per run
        let mut stats = BenchmarkStats {
            offload: 8_000_000,
            ..BenchmarkStats::default()
        };
        summarizer
            .summarize(
                &["Inference timings in us: Init: 10, Inference (avg): 5000"],
                Framework::TfLite,
                4,
                &mut stats,
            )
            .unwrap();
        assert_eq!(stats.inference, 3000);
        assert_eq!(stats.offload, 8_000_000);
    }

    #[test]
    fn test_tflite_malformed_lines_skipped() {
        let mut stats = BenchmarkStats {
            init: 7,
            ..BenchmarkStats::default()
        };
        summarize(
            &["PRE-PROCESSING pending", "Inference timings in us: none yet", "random noise"],
            Framework::TfLite,
            &mut stats,
        );
        assert_eq!(stats, BenchmarkStats {
            init: 7,
            ..BenchmarkStats::default()
        });
    }

    #[test]
    fn test_diagview_averages_sections() {
        let output = [
            "Log File Created: ...",
            "Init: 999 us",
            "Dnn Runtime Load/Deserialize/Create Statistics:",
            "Init: 100 us",
            "Forward Propagate Time: 900 us",
            "RPC Execute Time: 700 us",
            "Accelerator Time: 400 us",
            "Layer Times:",
            "0: 300 us : DSP",
            "Dnn Runtime Load/Deserialize/Create Statistics:",
            "Init: 300 us",
            "Forward Propagate Time: 1100 us",
            "RPC Execute Time: 900 us",
            "Accelerator Time: 600 us",
            "Layer Times:",
        ];
        let mut stats = BenchmarkStats {
            preproc: 5,
            ..BenchmarkStats::default()
        };
        summarize(&output, Framework::Snpe, &mut stats);

        assert_eq!(stats.init, 200);
        assert_eq!(stats.inference, 1000);
        assert_eq!(stats.offload, 800 - 500);
        assert_eq!(stats.delegation, 1000 - 800);
        assert_eq!(stats.preproc, 0);
    }

    #[test]
    fn test_diagview_without_sections_is_zero() {
        let mut stats = BenchmarkStats {
            inference: 42,
            ..BenchmarkStats::default()
        };
        summarize(&["Init: 5 us"], Framework::Snpe, &mut stats);
        assert_eq!(stats, BenchmarkStats::default());
    }

    #[test]
    fn test_mlperf_not_implemented() {
        let summarizer = BenchmarkSummarizer::new().unwrap();
        let mut stats = BenchmarkStats::default();
        let result = summarizer.summarize(&["anything"], Framework::MlPerf, 1, &mut stats);
        assert!(matches!(result, Err(AtopError::NotImplemented(_))));
    }
}
