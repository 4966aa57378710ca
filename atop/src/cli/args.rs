//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::benchmark::{Delegate, ExecutionPreference};
use crate::domain::Framework;

#[derive(Parser, Debug)]
#[command(
    name = "atop",
    version,
    about = "Accelerator activity monitor for Android devices",
    after_help = "\
EXAMPLES:
    atop                                     Monitor driver activity until Ctrl+C
    atop --benchmark -f tflite --runs 10     Run a TFLite benchmark and summarize it
    atop --sim --duration 5 --export a.json  Simulated device, export a session report"
)]
pub struct Args {
    /// Verbose output (info-level logging; RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,

    /// Run without a device, replaying canned output
    #[arg(short, long)]
    pub sim: bool,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Benchmark framework
    #[arg(short, long, default_value = "tflite")]
    pub framework: Framework,

    /// Launch a benchmark at startup
    #[arg(short, long)]
    pub benchmark: bool,

    /// Exit once every launched benchmark has been summarized
    #[arg(long, requires = "benchmark")]
    pub exit_on_complete: bool,

    /// Concurrent benchmark processes
    #[arg(short, long, default_value = "1")]
    pub processes: u32,

    /// Benchmark runs
    #[arg(long, default_value = "1")]
    pub runs: u32,

    #[arg(long, default_value = "0")]
    pub warmup_runs: u32,

    /// CPU threads used by the benchmark
    #[arg(long, default_value = "4")]
    pub threads: u32,

    #[arg(short, long, value_enum, default_value_t = Delegate::Hexagon)]
    pub delegate: Delegate,

    /// Let unsupported ops fall back to the CPU
    #[arg(long)]
    pub cpu_fallback: bool,

    /// Enable NNAPI driver timing logs (debug.nn.vlog)
    #[arg(long)]
    pub driver_logging: bool,

    /// Leave the debugfs driver logging switches untouched
    #[arg(long)]
    pub no_kernel_logging: bool,

    /// NNAPI execution preference
    #[arg(long, value_enum, default_value_t = ExecutionPreference::FastSingleAnswer)]
    pub exec_pref: ExecutionPreference,

    /// Seed for model selection (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Count every interaction in the log instead of the recent window
    #[arg(long)]
    pub full_log: bool,

    /// Recency window for interaction counts, in seconds
    #[arg(long, default_value = "20.0")]
    pub recency_threshold: f64,

    /// Snapshots a streamer may queue ahead of the display
    #[arg(long, default_value = "10")]
    pub queue_capacity: usize,

    /// Benchmark worker threads
    #[arg(long, default_value = "8")]
    pub pool_size: usize,

    /// Export a JSON session report on exit
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
