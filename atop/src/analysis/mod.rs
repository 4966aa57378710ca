//! Analysis of streamed and benchmark data
//!
//! Pure parsing/aggregation logic, separated from polling and presentation.

pub mod breakdown;
pub mod offload;
pub mod summarizer;

pub use breakdown::BreakdownParser;
pub use offload::{is_benchmark_process, OffloadEstimator, OffloadUpdate};
pub use summarizer::BenchmarkSummarizer;
