//! Device log (logcat) streamer.
//!
//! Unlike dmesg, logcat can filter by time itself (`-T '<time>'`), so the
//! watermark is the formatted timestamp handed back to the device. The filter
//! is inclusive, which is why the watermark is advanced one millisecond past
//! the newest line seen. Output is chronological, so the newest line is the
//! last one; timestamps carry no year and are never compared across polls.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{AtopError, LogcatProbe};
use crate::shell::ShellExecutor;
use crate::text::extract_logcat_timestamp;

/// Tag → lines, chronological. Every configured tag has an entry.
pub type LogcatBuckets = BTreeMap<String, Vec<String>>;

/// logcat omits the year; pin a leap year so `02-29` parses.
const PINNED_YEAR: &str = "2000";
const LOGCAT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Published state of one poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogcatSnapshot {
    pub data: LogcatBuckets,
    pub is_data_fresh: bool,
}

pub struct LogcatStreamer {
    shell: Arc<dyn ShellExecutor>,
    probes: Vec<LogcatProbe>,
    /// `-s tag:V ...` filter arguments
    tag_args: String,
    /// Captures the tag field of a `threadtime` line (`... I tflite  : msg`)
    tag_pattern: Regex,

    watermark: String,
    latest_data: LogcatBuckets,
    is_data_fresh: bool,
}

impl LogcatStreamer {
    /// # Errors
    /// `AtopError::NoProbes` for an empty tag list.
    pub fn new(shell: Arc<dyn ShellExecutor>, probes: &[LogcatProbe]) -> Result<Self, AtopError> {
        if probes.is_empty() {
            return Err(AtopError::NoProbes);
        }

        let tag_args =
            probes.iter().map(|p| format!("{}:V", p.tag())).collect::<Vec<_>>().join(" ");
        let alternation =
            probes.iter().map(|p| regex::escape(p.tag())).collect::<Vec<_>>().join("|");
        let tag_pattern = Regex::new(&format!(r"\s[VDIWEFS]\s+({alternation})\s*:"))?;

        Ok(Self {
            shell,
            probes: probes.to_vec(),
            tag_args,
            tag_pattern,
            watermark: String::new(),
            latest_data: Self::empty_buckets(probes),
            is_data_fresh: false,
        })
    }

    /// The logcat command for the next poll.
    #[must_use]
    pub fn command(&self) -> String {
        let mut cmd = format!("logcat -d -v threadtime -s {}", self.tag_args);
        if !self.watermark.is_empty() {
            cmd.push_str(&format!(" -T '{}'", self.watermark));
        }
        cmd
    }

    /// Fetch lines logged since the watermark and bucket them by tag.
    ///
    /// # Errors
    /// Shell failures.
    pub fn more(&mut self) -> Result<&LogcatBuckets, AtopError> {
        let had_watermark = !self.watermark.is_empty();
        let lines = self.shell.execute(&self.command())?;

        let mut data = Self::empty_buckets(&self.probes);
        let mut newest = None;
        for line in lines {
            let Some(tag) = self.tag_pattern.captures(&line).and_then(|c| c.get(1)) else {
                continue;
            };
            let tag = tag.as_str().to_string();
            if let Some(time) = parse_logcat_time(&extract_logcat_timestamp(&line)) {
                newest = Some(time);
            }
            data.entry(tag).or_default().push(line);
        }

        if let Some(newest) = newest {
            self.watermark = format_logcat_time(newest + ChronoDuration::milliseconds(1));
            debug!("logcat watermark advanced to {}", self.watermark);
        }

        let any_lines = data.values().any(|lines| !lines.is_empty());
        self.is_data_fresh = had_watermark && any_lines;
        self.latest_data = data;

        Ok(&self.latest_data)
    }

    #[must_use]
    pub fn snapshot(&self) -> LogcatSnapshot {
        LogcatSnapshot {
            data: self.latest_data.clone(),
            is_data_fresh: self.is_data_fresh,
        }
    }

    #[must_use]
    pub fn watermark(&self) -> &str {
        &self.watermark
    }

    #[must_use]
    pub fn latest_data(&self) -> &LogcatBuckets {
        &self.latest_data
    }

    #[must_use]
    pub fn is_data_fresh(&self) -> bool {
        self.is_data_fresh
    }

    fn empty_buckets(probes: &[LogcatProbe]) -> LogcatBuckets {
        probes.iter().map(|p| (p.tag().to_string(), Vec::new())).collect()
    }
}

fn parse_logcat_time(ts: &str) -> Option<NaiveDateTime> {
    if ts.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{PINNED_YEAR}-{ts}"), LOGCAT_TIME_FORMAT).ok()
}

fn format_logcat_time(ts: NaiveDateTime) -> String {
    ts.format("%m-%d %H:%M:%S%.3f").to_string()
}
