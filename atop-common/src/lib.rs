//! # Shared Data Model (streamers ↔ presentation)
//!
//! Plain data types produced by the aggregation engine in `atop` and consumed
//! by whatever presents them (the headless monitor, the JSON export, or a
//! future UI). Nothing here talks to a device.
//!
//! ## Key Types
//!
//! - [`BenchmarkStats`] - Latency breakdown of one benchmark session
//! - [`LatencyCategory`] - The fixed set of categories inside `BenchmarkStats`
//! - [`InteractionCounts`] - Accelerator tag → number of log lines
//! - [`IoctlBreakdown`] - Application → ioctl command → occurrences
//! - [`CpuUtilization`] - Core label → utilization percent

use std::collections::BTreeMap;

// ============================================================================
// Aggregation Maps
// ============================================================================

/// Accelerator/driver tag (e.g. `kgsl`, `cDSP`) → interaction count.
///
/// Ordered so consumers get a stable axis between snapshots.
pub type InteractionCounts = BTreeMap<String, u32>;

/// Application name → command name → occurrence count.
///
/// Accumulated across polls until the consumer clears it.
pub type IoctlBreakdown = BTreeMap<String, BTreeMap<String, u32>>;

/// Core label (`cpu0`, `cpu1`, ...) → utilization in percent.
pub type CpuUtilization = BTreeMap<String, f64>;

// ============================================================================
// Benchmark Statistics
// ============================================================================

/// Named latency category of a benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LatencyCategory {
    Preproc,
    Postproc,
    Inference,
    Offload,
    /// Framework overhead for delegation
    Delegation,
    Init,
}

impl LatencyCategory {
    /// Every category, in display order.
    pub const ALL: [LatencyCategory; 6] = [
        LatencyCategory::Preproc,
        LatencyCategory::Postproc,
        LatencyCategory::Inference,
        LatencyCategory::Offload,
        LatencyCategory::Delegation,
        LatencyCategory::Init,
    ];

    /// Key used in summaries and exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LatencyCategory::Preproc => "preproc",
            LatencyCategory::Postproc => "postproc",
            LatencyCategory::Inference => "inference",
            LatencyCategory::Offload => "offload",
            LatencyCategory::Delegation => "delegation",
            LatencyCategory::Init => "init",
        }
    }
}

impl std::fmt::Display for LatencyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency breakdown of one benchmark session.
///
/// Values are microseconds. The one exception is `offload` for TFLite
/// sessions: kernel timing lines report seconds and are folded in as
/// nanoseconds, so the display layer divides by 1e6 to get milliseconds.
///
/// Produced fresh per session, overwritten by the summarizer and owned by the
/// caller for the lifetime of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BenchmarkStats {
    pub preproc: u64,
    pub postproc: u64,
    pub inference: u64,
    pub offload: u64,
    pub delegation: u64,
    pub init: u64,
}

impl BenchmarkStats {
    /// Read a category.
    #[must_use]
    pub fn get(&self, category: LatencyCategory) -> u64 {
        match category {
            LatencyCategory::Preproc => self.preproc,
            LatencyCategory::Postproc => self.postproc,
            LatencyCategory::Inference => self.inference,
            LatencyCategory::Offload => self.offload,
            LatencyCategory::Delegation => self.delegation,
            LatencyCategory::Init => self.init,
        }
    }

    /// Overwrite a category.
    pub fn set(&mut self, category: LatencyCategory, value: u64) {
        let slot = match category {
            LatencyCategory::Preproc => &mut self.preproc,
            LatencyCategory::Postproc => &mut self.postproc,
            LatencyCategory::Inference => &mut self.inference,
            LatencyCategory::Offload => &mut self.offload,
            LatencyCategory::Delegation => &mut self.delegation,
            LatencyCategory::Init => &mut self.init,
        };
        *slot = value;
    }

    /// All categories with their values, in display order.
    pub fn entries(&self) -> impl Iterator<Item = (LatencyCategory, u64)> + '_ {
        LatencyCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Zero every category (start of a new session).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = BenchmarkStats::default();
        assert!(stats.entries().all(|(_, v)| v == 0));
        assert_eq!(stats.entries().count(), 6);
    }

    #[test]
    fn test_set_and_clear() {
        let mut stats = BenchmarkStats::default();
        stats.set(LatencyCategory::Inference, 5000);
        stats.set(LatencyCategory::Offload, 12);
        assert_eq!(stats.inference, 5000);
        assert_eq!(stats.get(LatencyCategory::Offload), 12);

        stats.clear();
        assert_eq!(stats, BenchmarkStats::default());
    }

    #[test]
    fn test_category_names() {
        let names: Vec<&str> = LatencyCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["preproc", "postproc", "inference", "offload", "delegation", "init"]);
    }
}
