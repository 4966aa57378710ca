//! Closed sets of probes and frameworks
//!
//! Each enum carries its on-device spelling so the rest of the crate never
//! matches on raw strings.

use std::fmt;
use std::str::FromStr;

use super::errors::AtopError;

// =============================================================================
// DMESG PROBES
// =============================================================================

/// Category of kernel log line emitted by the instrumented drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DmesgProbe {
    /// `IOCTL <driver>: (app: ..) (cmd: ..)` interaction lines
    Ioctl,
    /// `TIME <subsystem>: ...` timing lines
    Time,
    /// `INFO: (app: ..) ...` informational lines
    Info,
}

impl DmesgProbe {
    pub const ALL: [DmesgProbe; 3] = [DmesgProbe::Ioctl, DmesgProbe::Time, DmesgProbe::Info];

    /// Keyword that follows the timestamp in the kernel log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DmesgProbe::Ioctl => "IOCTL",
            DmesgProbe::Time => "TIME",
            DmesgProbe::Info => "INFO",
        }
    }
}

impl fmt::Display for DmesgProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DmesgProbe {
    type Err = AtopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AtopError::UnknownProbe(s.to_string()))
    }
}

// =============================================================================
// LOGCAT PROBES
// =============================================================================

/// Android log tag watched by the device-log streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogcatProbe {
    /// NNAPI runtime (`ExecutionBuilder`)
    ExecutionBuilder,
    /// TFLite benchmark tooling (`tflite`)
    TfLite,
}

impl LogcatProbe {
    pub const ALL: [LogcatProbe; 2] = [LogcatProbe::ExecutionBuilder, LogcatProbe::TfLite];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            LogcatProbe::ExecutionBuilder => "ExecutionBuilder",
            LogcatProbe::TfLite => "tflite",
        }
    }
}

impl fmt::Display for LogcatProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LogcatProbe {
    type Err = AtopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.tag() == s)
            .ok_or_else(|| AtopError::UnknownProbe(s.to_string()))
    }
}

// =============================================================================
// FRAMEWORKS
// =============================================================================

/// Inference framework whose benchmark tool is driven on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Framework {
    /// `benchmark_model` command-line tool
    TfLite,
    /// TFLite benchmark Android app (results via logcat)
    TfLiteApp,
    /// Qualcomm SNPE (`snpe-net-run` + `snpe-diagview`)
    Snpe,
    /// Declared but unsupported
    MlPerf,
}

impl Framework {
    pub const ALL: [Framework; 4] =
        [Framework::TfLite, Framework::TfLiteApp, Framework::MlPerf, Framework::Snpe];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Framework::TfLite => "tflite",
            Framework::TfLiteApp => "tflite_app",
            Framework::Snpe => "SNPE",
            Framework::MlPerf => "mlperf",
        }
    }

    /// Both TFLite flavours share output format and offload units.
    #[must_use]
    pub const fn is_tflite(self) -> bool {
        matches!(self, Framework::TfLite | Framework::TfLiteApp)
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = AtopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AtopError::UnknownFramework(s.to_string()))
    }
}
