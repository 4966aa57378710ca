//! Structured error types for atop
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::num::ParseFloatError;
use thiserror::Error;

/// A line of log or benchmark text could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No timestamp found in log line: {0:?}")]
    MissingTimestamp(String),

    #[error("Invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// A shell command could not be run.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Benchmark worker pool has shut down")]
    PoolClosed,
}

#[derive(Error, Debug)]
pub enum AtopError {
    /// Deliberate sentinel for an unsupported framework or probe.
    #[error("{0} is not implemented")]
    NotImplemented(String),

    #[error("At least one probe is required")]
    NoProbes,

    #[error("Unknown probe {0:?}")]
    UnknownProbe(String),

    #[error("Unknown framework {0:?}")]
    UnknownFramework(String),

    #[error("No models selected for {0}")]
    NoModels(String),

    #[error("Path '{0}' doesn't exist on device")]
    MissingDeviceBinary(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_display() {
        let err = AtopError::NotImplemented("Framework mlperf".to_string());
        assert_eq!(err.to_string(), "Framework mlperf is not implemented");
    }

    #[test]
    fn test_spawn_failed_display() {
        let err = ExecutionError::SpawnFailed {
            command: "adb shell dmesg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("adb shell dmesg"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_parse_error_converts() {
        let err: AtopError = ParseError::MissingTimestamp("oops".to_string()).into();
        assert!(matches!(err, AtopError::Parse(ParseError::MissingTimestamp(_))));
    }
}
