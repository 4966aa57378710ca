//! # Kernel Log Streamer
//!
//! Polls `dmesg` on the device and publishes only the lines that appeared
//! since the previous poll.
//!
//! ## Watermark
//!
//! dmesg has no "tail" primitive, so every poll re-reads the whole ring buffer
//! and reclassifies it. The streamer remembers the newest timestamp it has
//! already published (seconds since boot) and, per probe bucket, walks the
//! fresh read from newest to oldest until it reaches a line at or below that
//! watermark. Equal timestamps count as "already seen", so the boundary line
//! is never published twice.
//!
//! ```text
//!  full read:   [1.0] [2.0] [3.0] [4.0] [5.0]
//!                           ▲ watermark
//!  delta:                         [4.0] [5.0]   → watermark := 5.0
//! ```
//!
//! ## Interactions
//!
//! `interactions()` turns the delta of the utilization probe into a
//! tag → count map (`IOCTL kgsl:` counts towards `kgsl`).

use atop_common::InteractionCounts;
use log::debug;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::classifier::{ProbeBuckets, ProbeClassifier};
use crate::domain::{AtopError, DmesgProbe};
use crate::shell::ShellExecutor;
use crate::text::{capture_groups, extract_timestamp};

/// Command fetching the kernel ring buffer.
pub const DMESG_COMMAND: &str = "dmesg";

/// Accelerator tags that always get an entry, so consumers have a stable axis.
pub const KNOWN_ACCELERATOR_TAGS: [&str; 10] =
    ["ardeno", "kgsl", "vidioc", "cam_sensor", "v4l2", "IPA", "aDSP", "cDSP", "ICE", "Others"];

/// Default recency window for `interactions(false, ..)`.
pub const DEFAULT_RECENCY_THRESHOLD_SECS: f64 = 20.0;

/// Published state of one poll, safe to hand to another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct DmesgSnapshot {
    pub interactions: InteractionCounts,
    /// Lines that arrived since the previous poll
    pub delta: ProbeBuckets,
    pub is_data_fresh: bool,
    pub stream_latency: Duration,
}

/// Incremental reader of the device kernel log.
pub struct DmesgStreamer {
    shell: Arc<dyn ShellExecutor>,
    classifier: ProbeClassifier,
    utilization_probe: DmesgProbe,
    /// Captures the accelerator name after the utilization probe keyword
    tag_pattern: Regex,

    watermark: f64,
    latest_data: ProbeBuckets,
    latest_interactions: InteractionCounts,
    is_data_fresh: bool,
    /// Wall-clock duration of the last `interactions` call
    stream_latency: Duration,
}

impl DmesgStreamer {
    /// Read the current log once and set the watermark past everything in it.
    ///
    /// # Errors
    /// Propagates shell failures, an empty probe list, or a probe line whose
    /// timestamp cannot be parsed.
    pub fn new(
        shell: Arc<dyn ShellExecutor>,
        probes: &[DmesgProbe],
        utilization_probe: DmesgProbe,
    ) -> Result<Self, AtopError> {
        let classifier = ProbeClassifier::new(probes)?;
        let probe = regex::escape(utilization_probe.as_str());
        let tag_pattern = Regex::new(&format!(r"{probe} ([A-Za-z0-9_-]+):"))?;

        let latest_data = classifier.classify(&shell.execute(DMESG_COMMAND)?);

        let mut watermark = 0.0_f64;
        for (_, bucket) in latest_data.iter() {
            if let Some(newest) = bucket.last() {
                watermark = watermark.max(extract_timestamp(newest)?);
            }
        }
        debug!("dmesg watermark initialised at {watermark}");

        let latest_interactions =
            KNOWN_ACCELERATOR_TAGS.iter().map(|tag| ((*tag).to_string(), 0)).collect();

        Ok(Self {
            shell,
            classifier,
            utilization_probe,
            tag_pattern,
            watermark,
            latest_data,
            latest_interactions,
            is_data_fresh: false,
            stream_latency: Duration::ZERO,
        })
    }

    /// Streamer over every probe, counting interactions on `IOCTL`.
    ///
    /// # Errors
    /// See [`DmesgStreamer::new`].
    pub fn with_default_probes(shell: Arc<dyn ShellExecutor>) -> Result<Self, AtopError> {
        Self::new(shell, &DmesgProbe::ALL, DmesgProbe::Ioctl)
    }

    /// Fetch the log again and keep only lines newer than the watermark.
    ///
    /// # Errors
    /// Shell failures and unparseable timestamps on probe lines.
    pub fn more(&mut self) -> Result<&ProbeBuckets, AtopError> {
        let full = self.classifier.classify(&self.shell.execute(DMESG_COMMAND)?);

        let mut delta = ProbeBuckets::empty(self.classifier.probes());
        let mut newest = self.watermark;

        for (probe, lines) in full.iter() {
            let mut fresh = Vec::new();
            for line in lines.iter().rev() {
                let ts = extract_timestamp(line)?;
                if ts <= self.watermark {
                    break;
                }
                newest = newest.max(ts);
                fresh.push(line.clone());
            }
            fresh.reverse();
            if let Some(bucket) = delta.get_mut(probe) {
                *bucket = fresh;
            }
        }

        self.is_data_fresh = !delta.is_empty();
        if self.is_data_fresh {
            let count = delta.total_lines();
            debug!("dmesg: {count} new lines, watermark {} → {newest}", self.watermark);
            self.watermark = newest;
        } else {
            self.reset_interactions();
        }
        self.latest_data = delta;

        Ok(&self.latest_data)
    }

    /// Count accelerator interactions in the newest utilization-probe lines.
    ///
    /// With `check_full_log` every line of the delta is eligible, otherwise
    /// only lines within `threshold_secs` of the newest one.
    ///
    /// # Errors
    /// See [`DmesgStreamer::more`].
    pub fn interactions(
        &mut self,
        check_full_log: bool,
        threshold_secs: f64,
    ) -> Result<&InteractionCounts, AtopError> {
        let start = Instant::now();
        self.more()?;

        let bucket = self.latest_data.get(self.utilization_probe);
        let Some(newest) = bucket.last() else {
            self.reset_interactions();
            self.stream_latency = start.elapsed();
            return Ok(&self.latest_interactions);
        };

        let eligible: &[String] = if check_full_log {
            bucket
        } else {
            let cutoff = extract_timestamp(newest)? - threshold_secs;
            let mut first = bucket.len();
            for (i, line) in bucket.iter().enumerate().rev() {
                if extract_timestamp(line)? < cutoff {
                    break;
                }
                first = i;
            }
            &bucket[first..]
        };

        for count in self.latest_interactions.values_mut() {
            *count = 0;
        }
        for line in eligible {
            let tag = capture_groups(&self.tag_pattern, line).and_then(|g| g.into_iter().next());
            let Some(tag) = tag else {
                continue;
            };
            *self.latest_interactions.entry(tag).or_insert(0) += 1;
        }

        self.stream_latency = start.elapsed();
        Ok(&self.latest_interactions)
    }

    /// Copy of the published state for the foreground consumer.
    #[must_use]
    pub fn snapshot(&self) -> DmesgSnapshot {
        DmesgSnapshot {
            interactions: self.latest_interactions.clone(),
            delta: self.latest_data.clone(),
            is_data_fresh: self.is_data_fresh,
            stream_latency: self.stream_latency,
        }
    }

    #[must_use]
    pub fn watermark(&self) -> f64 {
        self.watermark
    }

    #[must_use]
    pub fn latest_data(&self) -> &ProbeBuckets {
        &self.latest_data
    }

    #[must_use]
    pub fn latest_interactions(&self) -> &InteractionCounts {
        &self.latest_interactions
    }

    #[must_use]
    pub fn is_data_fresh(&self) -> bool {
        self.is_data_fresh
    }

    #[must_use]
    pub fn stream_latency(&self) -> Duration {
        self.stream_latency
    }

    #[must_use]
    pub fn utilization_probe(&self) -> DmesgProbe {
        self.utilization_probe
    }

    fn reset_interactions(&mut self) {
        for count in self.latest_interactions.values_mut() {
            *count = 0;
        }
    }
}
