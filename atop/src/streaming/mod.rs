//! Log streaming
//!
//! Incremental readers over the device's kernel log, device log and
//! `/proc/stat`, plus the background loops that drive them:
//! - Probe classification of dmesg lines
//! - Watermarked dmesg and logcat streamers
//! - Per-core CPU utilization
//! - Poller threads publishing snapshots into bounded queues

pub mod classifier;
pub mod cpu;
pub mod dmesg;
pub mod logcat;
pub mod poller;

pub use classifier::{ProbeBuckets, ProbeClassifier};
pub use cpu::CpuStreamer;
pub use dmesg::{DmesgSnapshot, DmesgStreamer, DEFAULT_RECENCY_THRESHOLD_SECS};
pub use logcat::{LogcatBuckets, LogcatSnapshot, LogcatStreamer};
pub use poller::{spawn_poller, Pollers};
