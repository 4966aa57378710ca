//! Session export
//!
//! Writes the aggregates of a monitoring session as one JSON document
//! (`--export FILE`). Raw counters are kept in their native units next to a
//! millisecond summary so the file can be read without knowing the unit rules.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use atop_common::{
    BenchmarkStats, CpuUtilization, InteractionCounts, IoctlBreakdown, LatencyCategory,
};

use crate::display::latency_ms;
use crate::domain::AtopError;
use crate::session::Session;

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub version: String,
    /// Device serial, `sim` in simulation mode
    pub device: String,
    pub framework: String,
    pub runs: u32,
    pub duration_secs: f64,
    /// RFC 3339 wall-clock time of the export
    pub generated_at: String,
    pub completed_benchmarks: u32,

    pub stats: BenchmarkStats,
    pub latency_ms: BTreeMap<LatencyCategory, f64>,
    pub interactions: InteractionCounts,
    pub max_interactions: InteractionCounts,
    pub breakdown: IoctlBreakdown,
    pub cpu: CpuUtilization,
}

impl SessionReport {
    #[must_use]
    pub fn from_session(session: &Session, device: &str, duration_secs: f64) -> Self {
        let framework = session.framework();
        let runs = session.runs();
        let latency_ms = LatencyCategory::ALL
            .iter()
            .map(|&c| (c, latency_ms(session.stats(), c, framework, runs)))
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device: device.to_string(),
            framework: framework.to_string(),
            runs,
            duration_secs,
            generated_at: chrono::Local::now().to_rfc3339(),
            completed_benchmarks: session.completed_benchmarks(),
            stats: session.stats().clone(),
            latency_ms,
            interactions: session.interactions().clone(),
            max_interactions: session.max_interactions().clone(),
            breakdown: session.breakdown().clone(),
            cpu: session.cpu().clone(),
        }
    }

    /// Pretty-printed JSON into `writer`.
    ///
    /// # Errors
    /// Serialization or write failure.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), AtopError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Framework;

    #[test]
    fn test_report_contains_summary_in_ms() {
        let session = Session::new(Framework::Snpe, 2).unwrap();
        let report = SessionReport::from_session(&session, "sim", 1.5);

        let mut buffer = Vec::new();
        report.export(&mut buffer).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(parsed["framework"], "SNPE");
        assert_eq!(parsed["runs"], 2);
        assert_eq!(parsed["device"], "sim");
        assert_eq!(parsed["latency_ms"]["inference"], 0.0);
        assert!(parsed["generated_at"].as_str().is_some_and(|s| !s.is_empty()));
    }
}
