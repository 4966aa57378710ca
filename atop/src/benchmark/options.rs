//! Benchmark tool options and their command-line rendering.

use clap::ValueEnum;
use std::fmt;

use crate::domain::AtopError;

/// Accelerator the benchmark offloads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Delegate {
    /// Hexagon DSP delegate (quantized models only)
    #[default]
    Hexagon,
    Gpu,
    /// NNAPI with the platform's choice of accelerator
    Nnapi,
    /// No delegate
    Cpu,
    NnapiDsp,
    NnapiGpu,
    NnapiPaintbox,
    NnapiHta,
}

impl Delegate {
    #[must_use]
    pub const fn uses_nnapi(self) -> bool {
        matches!(
            self,
            Delegate::Nnapi
                | Delegate::NnapiDsp
                | Delegate::NnapiGpu
                | Delegate::NnapiPaintbox
                | Delegate::NnapiHta
        )
    }

    /// `--nnapi_accelerator_name` value; empty lets NNAPI decide.
    #[must_use]
    pub const fn nnapi_accelerator_name(self) -> &'static str {
        match self {
            Delegate::NnapiDsp => "qti-dsp",
            Delegate::NnapiGpu => "qti-gpu",
            Delegate::NnapiPaintbox => "paintbox",
            Delegate::NnapiHta => "qti-hta",
            _ => "",
        }
    }

    /// The TFLite DSP paths only accept quantized graphs.
    #[must_use]
    pub const fn requires_quantized(self) -> bool {
        matches!(self, Delegate::Hexagon | Delegate::NnapiDsp)
    }
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(v) => f.write_str(v.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

/// NNAPI execution preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExecutionPreference {
    #[default]
    FastSingleAnswer,
    SustainedSpeed,
    LowPower,
    Undefined,
}

impl ExecutionPreference {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionPreference::FastSingleAnswer => "fast_single_answer",
            ExecutionPreference::SustainedSpeed => "sustained_speed",
            ExecutionPreference::LowPower => "low_power",
            ExecutionPreference::Undefined => "undefined",
        }
    }
}

// =============================================================================
// TFLITE
// =============================================================================

/// Options passed to `benchmark_model` (and the benchmark app).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfliteOptions {
    pub threads: u32,
    pub warmup_runs: u32,
    pub runs: u32,
    pub delegate: Delegate,
    /// Allow ops the delegate cannot run to fall back to the CPU
    pub cpu_fallback: bool,
    /// Ask the NNAPI driver to log its own timing (`--time_driver`)
    pub time_driver: bool,
    pub exec_pref: ExecutionPreference,
}

impl Default for TfliteOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            warmup_runs: 0,
            runs: 1,
            delegate: Delegate::default(),
            cpu_fallback: false,
            time_driver: false,
            exec_pref: ExecutionPreference::default(),
        }
    }
}

impl TfliteOptions {
    /// `(flag, value)` pairs, sorted by flag name.
    #[must_use]
    pub fn flags(&self) -> Vec<(&'static str, String)> {
        let use_nnapi = self.delegate.uses_nnapi();
        let mut flags = vec![
            ("disable_nnapi_cpu", (!self.cpu_fallback && use_nnapi).to_string()),
            ("enable_op_profiling", "false".to_string()),
            ("hexagon_profiling", "false".to_string()),
            ("nnapi_accelerator_name", self.delegate.nnapi_accelerator_name().to_string()),
            ("nnapi_execution_preference", self.exec_pref.as_str().to_string()),
            ("num_runs", self.runs.to_string()),
            ("num_threads", self.threads.to_string()),
            ("require_full_delegation", (!self.cpu_fallback).to_string()),
            ("time_driver", self.time_driver.to_string()),
            ("use_gpu", (self.delegate == Delegate::Gpu).to_string()),
            ("use_hexagon", (self.delegate == Delegate::Hexagon).to_string()),
            ("use_nnapi", use_nnapi.to_string()),
            ("warmup_runs", self.warmup_runs.to_string()),
        ];
        flags.sort_by_key(|(k, _)| *k);
        flags
    }

    /// `--key=value` arguments joined by spaces.
    #[must_use]
    pub fn to_args(&self) -> String {
        self.flags().iter().map(|(k, v)| format!("--{k}={v}")).collect::<Vec<_>>().join(" ")
    }
}

// =============================================================================
// SNPE
// =============================================================================

/// Options passed to `snpe-net-run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnpeOptions {
    pub delegate: Delegate,
    pub cpu_fallback: bool,
}

impl SnpeOptions {
    /// # Errors
    /// `AtopError::NotImplemented` for delegates SNPE has no runtime for.
    pub fn new(delegate: Delegate, cpu_fallback: bool) -> Result<Self, AtopError> {
        match delegate {
            Delegate::Hexagon | Delegate::Gpu | Delegate::Cpu => Ok(Self {
                delegate,
                cpu_fallback,
            }),
            other => Err(AtopError::NotImplemented(format!("Delegate {other} with SNPE"))),
        }
    }

    #[must_use]
    pub fn to_args(&self) -> String {
        let mut args = vec!["--perf_profile high_performance", "--profiling_level detailed"];
        match self.delegate {
            Delegate::Hexagon => args.push("--use_dsp"),
            Delegate::Gpu => args.push("--use_gpu"),
            _ => {}
        }
        if self.cpu_fallback {
            args.push("--enable_cpu_fallback");
        }
        args.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tflite_args() {
        let args = TfliteOptions::default().to_args();
        assert!(args.starts_with("--disable_nnapi_cpu=false --enable_op_profiling=false"));
        assert!(args.contains("--use_hexagon=true"));
        assert!(args.contains("--use_nnapi=false"));
        assert!(args.contains("--require_full_delegation=true"));
        assert!(args.contains("--nnapi_accelerator_name= "));
        assert!(args.ends_with("--warmup_runs=0"));
    }

    #[test]
    fn test_nnapi_dsp_flags() {
        let opts = TfliteOptions {
            delegate: Delegate::NnapiDsp,
            cpu_fallback: false,
            ..TfliteOptions::default()
        };
        let flags = opts.flags();
        let get = |k: &str| flags.iter().find(|(f, _)| *f == k).map(|(_, v)| v.as_str());
        assert_eq!(get("use_nnapi"), Some("true"));
        assert_eq!(get("disable_nnapi_cpu"), Some("true"));
        assert_eq!(get("nnapi_accelerator_name"), Some("qti-dsp"));
        assert_eq!(get("use_hexagon"), Some("false"));
    }

    #[test]
    fn test_quantized_requirement() {
        assert!(Delegate::Hexagon.requires_quantized());
        assert!(Delegate::NnapiDsp.requires_quantized());
        assert!(!Delegate::Gpu.requires_quantized());
    }

    #[test]
    fn test_snpe_args() {
        let opts = SnpeOptions::new(Delegate::Gpu, true).unwrap();
        assert_eq!(
            opts.to_args(),
            "--perf_profile high_performance --profiling_level detailed \
             --use_gpu --enable_cpu_fallback"
        );
        let hta = SnpeOptions::new(Delegate::NnapiHta, false);
        assert!(matches!(hta, Err(AtopError::NotImplemented(_))));
    }

    #[test]
    fn test_delegate_display() {
        assert_eq!(Delegate::NnapiPaintbox.to_string(), "nnapi-paintbox");
        assert_eq!(ExecutionPreference::LowPower.as_str(), "low_power");
    }
}
