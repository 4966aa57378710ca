//! On-device benchmarks
//!
//! - Model discovery and random model selection
//! - Tool options (`benchmark_model`, `snpe-net-run`)
//! - Job construction per framework
//! - Worker pool running jobs asynchronously

pub mod commands;
pub mod models;
pub mod options;
pub mod runner;

pub use commands::{job_for, snpe_job, tflite_app_job, tflite_job};
pub use models::{filter_for_delegate, models_on_device, ModelSelector};
pub use options::{Delegate, ExecutionPreference, SnpeOptions, TfliteOptions};
pub use runner::{
    BenchmarkHandle, BenchmarkJob, BenchmarkOutput, BenchmarkRunner, DEFAULT_POOL_SIZE,
};
