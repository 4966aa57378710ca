//! Monitor configuration
//!
//! Everything the streamers, pollers and benchmark pool need, resolved once
//! from the command line.

use std::time::Duration;

use crate::benchmark::{SnpeOptions, TfliteOptions};
use crate::cli::Args;
use crate::domain::{AtopError, DmesgProbe, Framework, LogcatProbe};
use crate::queue::DEFAULT_CAPACITY;
use crate::streaming::poller::{CPU_POLL_INTERVAL, DMESG_POLL_INTERVAL, LOGCAT_POLL_INTERVAL};
use crate::streaming::DEFAULT_RECENCY_THRESHOLD_SECS;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub dmesg_probes: Vec<DmesgProbe>,
    /// Probe whose lines are counted as accelerator interactions
    pub utilization_probe: DmesgProbe,
    pub logcat_probes: Vec<LogcatProbe>,

    pub check_full_log: bool,
    pub recency_threshold_secs: f64,

    pub dmesg_interval: Duration,
    pub logcat_interval: Duration,
    pub cpu_interval: Duration,

    pub queue_capacity: usize,
    pub pool_size: usize,

    pub framework: Framework,
    pub processes: u32,
    pub tflite: TfliteOptions,
    /// Only set when the delegate is one SNPE supports
    pub snpe: Option<SnpeOptions>,
    pub seed: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            dmesg_probes: DmesgProbe::ALL.to_vec(),
            utilization_probe: DmesgProbe::Ioctl,
            logcat_probes: LogcatProbe::ALL.to_vec(),
            check_full_log: false,
            recency_threshold_secs: DEFAULT_RECENCY_THRESHOLD_SECS,
            dmesg_interval: DMESG_POLL_INTERVAL,
            logcat_interval: LOGCAT_POLL_INTERVAL,
            cpu_interval: CPU_POLL_INTERVAL,
            queue_capacity: DEFAULT_CAPACITY,
            pool_size: crate::benchmark::DEFAULT_POOL_SIZE,
            framework: Framework::TfLite,
            processes: 1,
            tflite: TfliteOptions::default(),
            snpe: None,
            seed: None,
        }
    }
}

impl MonitorConfig {
    /// # Errors
    /// `AtopError::NotImplemented` when an SNPE benchmark is requested with a
    /// delegate SNPE cannot use.
    pub fn from_args(args: &Args) -> Result<Self, AtopError> {
        let tflite = TfliteOptions {
            threads: args.threads,
            warmup_runs: args.warmup_runs,
            runs: args.runs,
            delegate: args.delegate,
            cpu_fallback: args.cpu_fallback,
            time_driver: args.driver_logging,
            exec_pref: args.exec_pref,
        };

        let snpe = match SnpeOptions::new(args.delegate, args.cpu_fallback) {
            Ok(opts) => Some(opts),
            Err(e) if args.benchmark && args.framework == Framework::Snpe => return Err(e),
            Err(_) => None,
        };

        Ok(Self {
            check_full_log: args.full_log,
            recency_threshold_secs: args.recency_threshold,
            queue_capacity: args.queue_capacity,
            pool_size: args.pool_size,
            framework: args.framework,
            processes: args.processes,
            tflite,
            snpe,
            seed: args.seed,
            ..Self::default()
        })
    }
}
