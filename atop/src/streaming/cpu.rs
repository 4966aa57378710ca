//! Per-core CPU utilization from `/proc/stat`.
//!
//! Each `cpuN` row lists cumulative tick counters. Utilization is the busy
//! share of the ticks elapsed since the previous poll:
//!
//! ```text
//! 100 * (Δtotal - Δidle) / Δtotal      idle = idle + iowait
//! ```

use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

use atop_common::CpuUtilization;

use crate::domain::AtopError;
use crate::shell::ShellExecutor;

pub const PROC_STAT_COMMAND: &str = "cat /proc/stat";

/// Column positions inside a `cpuN` row (after the label).
const IDLE_COLUMN: usize = 3;
const IOWAIT_COLUMN: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Ticks {
    total: u64,
    idle: u64,
}

/// Parse one `/proc/stat` row. Only per-core rows (`cpu0`, `cpu1`, ...) count.
fn parse_core_row(line: &str) -> Option<(String, Ticks)> {
    let mut fields = line.split_whitespace();
    let label = fields.next()?;
    let index = label.strip_prefix("cpu")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let columns = fields.map(str::parse::<u64>).collect::<Result<Vec<_>, _>>().ok()?;
    if columns.len() <= IOWAIT_COLUMN {
        return None;
    }

    let idle = columns[IDLE_COLUMN] + columns[IOWAIT_COLUMN];
    let total = columns.iter().sum();
    Some((label.to_string(), Ticks { total, idle }))
}

pub struct CpuStreamer {
    shell: Arc<dyn ShellExecutor>,
    previous: BTreeMap<String, Ticks>,
    latest_utils: CpuUtilization,
}

impl CpuStreamer {
    #[must_use]
    pub fn new(shell: Arc<dyn ShellExecutor>) -> Self {
        Self {
            shell,
            previous: BTreeMap::new(),
            latest_utils: CpuUtilization::new(),
        }
    }

    /// Poll `/proc/stat` and recompute utilization for every core.
    ///
    /// The first poll measures against boot (all counters zero). A core whose
    /// counters did not move keeps its previous value.
    ///
    /// # Errors
    /// Shell failures.
    pub fn utilizations(&mut self) -> Result<&CpuUtilization, AtopError> {
        let lines = self.shell.execute(PROC_STAT_COMMAND)?;

        for line in &lines {
            let Some((label, now)) = parse_core_row(line) else {
                continue;
            };
            let before = self.previous.get(&label).copied().unwrap_or_default();

            let del_total = now.total.saturating_sub(before.total);
            let del_idle = now.idle.saturating_sub(before.idle);

            if del_total == 0 {
                debug!("{label}: no ticks elapsed, keeping previous utilization");
                self.latest_utils.entry(label.clone()).or_insert(0.0);
            } else {
                #[allow(clippy::cast_precision_loss)]
                let busy = 100.0 * del_total.saturating_sub(del_idle) as f64 / del_total as f64;
                self.latest_utils.insert(label.clone(), busy);
            }
            self.previous.insert(label, now);
        }

        Ok(&self.latest_utils)
    }

    #[must_use]
    pub fn latest(&self) -> &CpuUtilization {
        &self.latest_utils
    }

    #[must_use]
    pub fn snapshot(&self) -> CpuUtilization {
        self.latest_utils.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ReplayShell;

    fn streamer(shell: ReplayShell) -> CpuStreamer {
        CpuStreamer::new(Arc::new(shell))
    }

    #[test]
    fn test_parse_core_row() {
        let (label, ticks) = parse_core_row("cpu2 10 0 10 70 10 0 0 0 0 0").unwrap();
        assert_eq!(label, "cpu2");
        assert_eq!((ticks.total, ticks.idle), (100, 80));

        assert!(parse_core_row("cpu  10 0 10 70 10 0 0 0 0 0").is_none());
        assert!(parse_core_row("intr 1 2 3 4 5 6").is_none());
        assert!(parse_core_row("cpu1 10 x 10").is_none());
        assert!(parse_core_row("cpu1 10 10").is_none());
    }

    #[test]
    fn test_utilization_from_deltas() {
        let shell = ReplayShell::new()
            .respond("cat /proc/stat", ["cpu  0 0 0 0 0", "cpu0 10 0 10 70 10", "cpu1 0 0 0 100 0"])
            .respond(
                "cat /proc/stat",
                ["cpu  0 0 0 0 0", "cpu0 40 0 30 120 10", "cpu1 50 0 0 150 0"],
            );
        let mut s = streamer(shell);

        let first = s.utilizations().unwrap().clone();
        assert!((first["cpu0"] - 20.0).abs() < 1e-9);
        assert!((first["cpu1"] - 0.0).abs() < 1e-9);

        let second = s.utilizations().unwrap();
        // cpu0: Δtotal 100, Δidle 50
        assert!((second["cpu0"] - 50.0).abs() < 1e-9);
        // cpu1: Δtotal 100, Δidle 50
        assert!((second["cpu1"] - 50.0).abs() < 1e-9);
        assert!(!second.contains_key("cpu"));
    }

    #[test]
    fn test_zero_delta_keeps_previous_value() {
        let shell = ReplayShell::new().respond("cat /proc/stat", ["cpu0 25 0 25 50 0"]);
        let mut s = streamer(shell);

        assert!((s.utilizations().unwrap()["cpu0"] - 50.0).abs() < 1e-9);
        // Same counters again: nothing elapsed
        assert!((s.utilizations().unwrap()["cpu0"] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_core_since_boot_is_zero() {
        let shell = ReplayShell::new().respond("cat /proc/stat", ["cpu3 0 0 0 0 0"]);
        let mut s = streamer(shell);
        assert_eq!(s.utilizations().unwrap()["cpu3"], 0.0);
    }

    #[test]
    fn test_shell_failure_propagates() {
        let mut s = streamer(ReplayShell::new().fail("cat"));
        assert!(matches!(s.utilizations(), Err(AtopError::Execution(_))));
        assert!(s.latest().is_empty());
    }
}
