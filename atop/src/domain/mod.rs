//! Domain model for atop
//!
//! This module contains core domain types and errors that provide:
//! - Closed enums for probes and frameworks (no stringly-typed dispatch)
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{DmesgProbe, Framework, LogcatProbe};

pub use errors::{AtopError, ExecutionError, ParseError};
