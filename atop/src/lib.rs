//! # atop - Accelerator Activity Monitor for Android
//!
//! atop drives an Android device over `adb` to watch how ML workloads use the
//! on-device accelerators (GPU, DSP, NPU). It streams the kernel log and the
//! device log, counts driver interactions per accelerator, estimates how much
//! time benchmarks spend offloaded to the kernel, and launches TFLite or SNPE
//! benchmarks whose textual output it summarizes into latency breakdowns.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Android device (adb)                       │
//! │   dmesg      logcat      /proc/stat      benchmark_model/snpe   │
//! └──────┬──────────┬────────────┬──────────────────┬───────────────┘
//!        │          │            │                  │ ShellExecutor
//!        ▼          ▼            ▼                  ▼
//! ┌─────────────────────────────────────┐   ┌──────────────────────┐
//! │  Pollers (one thread per streamer)  │   │   BenchmarkRunner    │
//! │  Dmesg / Logcat / Cpu streamers     │   │   (worker pool)      │
//! └──────────────────┬──────────────────┘   └──────────┬───────────┘
//!                    │ snapshots (BoundedQueue)         │ handles
//!                    ▼                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Session (foreground, tokio loop)              │
//! │   interaction counts · ioctl breakdown · offload · summaries    │
//! └──────────────────┬─────────────────────────────┬────────────────┘
//!                    ▼                             ▼
//!             ┌────────────┐               ┌──────────────┐
//!             │  Display   │               │    Export    │
//!             │ (terminal) │               │   (JSON)     │
//!             └────────────┘               └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Core Pipeline Modules
//!
//! - [`streaming`]: incremental log readers and their background pollers
//!   - `classifier`: buckets lines by probe keyword
//!   - `dmesg`: kernel log watermark, deltas and interaction counts
//!   - `logcat`: device log watermark and per-tag deltas
//!   - `cpu`: per-core utilization from `/proc/stat`
//!   - `poller`: poll → queue → sleep loops on named threads
//!
//! - [`analysis`]: turning lines into numbers
//!   - `summarizer`: TFLite and SNPE benchmark output → [`atop_common::BenchmarkStats`]
//!   - `offload`: kernel, GPU and driver offload time of benchmark processes
//!   - `breakdown`: per-application ioctl command counts
//!
//! - [`benchmark`]: model discovery, command construction and the worker pool
//!
//! - [`session`]: the foreground consumer folding snapshots and results
//!
//! ### Edges
//!
//! - [`shell`]: the [`shell::ShellExecutor`] seam (adb, host, replay)
//! - [`preflight`]: adb / device / root checks
//! - [`device`]: debugfs and `debug.nn.vlog` logging switches
//! - [`cli`] and [`config`]: command line and resolved configuration
//! - [`display`] and [`export`]: terminal output and JSON session report
//! - [`sim`]: a replayed device for `--sim`
//!
//! ### Foundations
//!
//! - [`domain`]: probes, frameworks and errors
//! - [`queue`]: bounded blocking queue between pollers and the session
//! - [`text`]: timestamp and substring helpers

pub mod analysis;
pub mod benchmark;
pub mod cli;
pub mod config;
pub mod device;
pub mod display;
pub mod domain;
pub mod export;
pub mod preflight;
pub mod queue;
pub mod session;
pub mod shell;
pub mod sim;
pub mod streaming;
pub mod text;

pub use domain::{AtopError, DmesgProbe, Framework, LogcatProbe};
pub use session::Session;
