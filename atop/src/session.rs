//! Foreground session state
//!
//! The consumer side of the pipeline. Pollers publish snapshots; the session
//! folds them into the aggregates the display and export read:
//!
//! - latest and peak interaction counts
//! - the per-application ioctl breakdown (fresh dmesg deltas only)
//! - kernel/driver offload of TFLite benchmarks (fresh deltas only)
//! - per-core CPU utilization
//! - benchmark results, summarized as their handles resolve

use log::{info, warn};
use std::collections::VecDeque;

use atop_common::{BenchmarkStats, CpuUtilization, InteractionCounts, IoctlBreakdown};

use crate::analysis::{BenchmarkSummarizer, BreakdownParser, OffloadEstimator};
use crate::benchmark::BenchmarkHandle;
use crate::domain::{AtopError, DmesgProbe, Framework};
use crate::streaming::{DmesgSnapshot, LogcatSnapshot};

/// Most recent device-log lines kept for display.
pub const LOG_CAPACITY: usize = 1000;

pub struct Session {
    framework: Framework,
    runs: u32,

    summarizer: BenchmarkSummarizer,
    offload: OffloadEstimator,
    breakdown_parser: BreakdownParser,

    stats: BenchmarkStats,
    breakdown: IoctlBreakdown,
    interactions: InteractionCounts,
    max_interactions: InteractionCounts,
    cpu: CpuUtilization,
    log: VecDeque<String>,

    pending: VecDeque<BenchmarkHandle>,
    completed: u32,
}

impl Session {
    /// # Errors
    /// Pattern compilation failure in one of the parsers.
    pub fn new(framework: Framework, runs: u32) -> Result<Self, AtopError> {
        Ok(Self {
            framework,
            runs: runs.max(1),
            summarizer: BenchmarkSummarizer::new()?,
            offload: OffloadEstimator::new()?,
            breakdown_parser: BreakdownParser::new()?,
            stats: BenchmarkStats::default(),
            breakdown: IoctlBreakdown::new(),
            interactions: InteractionCounts::new(),
            max_interactions: InteractionCounts::new(),
            cpu: CpuUtilization::new(),
            log: VecDeque::new(),
            pending: VecDeque::new(),
            completed: 0,
        })
    }

    /// Fold a kernel log snapshot in.
    pub fn apply_dmesg(&mut self, snapshot: &DmesgSnapshot) {
        for (tag, &count) in &snapshot.interactions {
            let peak = self.max_interactions.entry(tag.clone()).or_default();
            *peak = (*peak).max(count);
        }
        self.interactions.clone_from(&snapshot.interactions);

        if !snapshot.is_data_fresh {
            return;
        }

        for probe in [DmesgProbe::Ioctl, DmesgProbe::Info] {
            let lines = snapshot.delta.get(probe);
            if lines.is_empty() {
                continue;
            }
            let parsed = self.breakdown_parser.ioctl_breakdown(&mut self.breakdown, lines, probe);
            if let Err(e) = parsed {
                warn!("breakdown of {probe} lines failed: {e}");
            }
        }

        if self.framework.is_tflite() {
            let delta = &snapshot.delta;
            self.offload.update_kernel_offload(delta.get(DmesgProbe::Time), &mut self.stats);
            self.offload.update_kernel_gpu_offload(delta.get(DmesgProbe::Ioctl), &mut self.stats);
        }
    }

    /// Fold a device log snapshot in.
    pub fn apply_logcat(&mut self, snapshot: &LogcatSnapshot) {
        if !snapshot.is_data_fresh {
            return;
        }
        for lines in snapshot.data.values() {
            if self.framework.is_tflite() {
                self.offload.update_driver_offload(lines.as_slice(), &mut self.stats);
            }
            self.log.extend(lines.iter().cloned());
        }
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
    }

    pub fn apply_cpu(&mut self, utilization: CpuUtilization) {
        self.cpu = utilization;
    }

    /// Start a new benchmark session: previous results are cleared.
    pub fn track(&mut self, handle: BenchmarkHandle) {
        self.clear_results();
        self.framework = handle.framework();
        self.pending.push_back(handle);
    }

    /// Summarize benchmarks that finished, oldest first, and return how many
    /// completed during this call.
    pub fn poll_benchmarks(&mut self) -> usize {
        let mut finished = 0;
        while let Some(front) = self.pending.front_mut() {
            let Some(result) = front.try_take() else {
                break;
            };
            self.pending.pop_front();
            finished += 1;
            self.completed += 1;

            match result {
                Ok(output) => {
                    info!("Benchmark finished ({} lines of output)", output.lines.len());
                    let summary = self.summarizer.summarize(
                        output.lines.as_slice(),
                        output.framework,
                        self.runs,
                        &mut self.stats,
                    );
                    if let Err(e) = summary {
                        warn!("Could not summarize {} output: {e}", output.framework);
                    }
                }
                Err(e) => warn!("Benchmark failed: {e}"),
            }
        }
        finished
    }

    pub fn clear_results(&mut self) {
        self.stats = BenchmarkStats::default();
        self.breakdown.clear();
    }

    #[must_use]
    pub fn framework(&self) -> Framework {
        self.framework
    }

    #[must_use]
    pub fn runs(&self) -> u32 {
        self.runs
    }

    #[must_use]
    pub fn stats(&self) -> &BenchmarkStats {
        &self.stats
    }

    #[must_use]
    pub fn breakdown(&self) -> &IoctlBreakdown {
        &self.breakdown
    }

    #[must_use]
    pub fn interactions(&self) -> &InteractionCounts {
        &self.interactions
    }

    #[must_use]
    pub fn max_interactions(&self) -> &InteractionCounts {
        &self.max_interactions
    }

    #[must_use]
    pub fn cpu(&self) -> &CpuUtilization {
        &self.cpu
    }

    pub fn log(&self) -> impl Iterator<Item = &String> {
        self.log.iter()
    }

    #[must_use]
    pub fn pending_benchmarks(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn completed_benchmarks(&self) -> u32 {
        self.completed
    }
}
