//! # atop - Main Entry Point
//!
//! Headless monitor: pollers stream the device logs in the background, the
//! foreground loop folds their snapshots into a [`Session`], prints a status
//! line and, when asked, launches a benchmark and summarizes its output.
//!
//! - **Device** (`atop`): preflight adb checks, then everything runs through
//!   `adb shell`
//! - **Simulation** (`atop --sim`): a replayed device, no hardware needed

// Main function is intentionally long for clarity
#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::{Duration, Instant};

use atop::benchmark::{
    filter_for_delegate, job_for, models_on_device, BenchmarkHandle, BenchmarkRunner, ModelSelector,
};
use atop::cli::Args;
use atop::config::MonitorConfig;
use atop::device::{DriverLogging, KernelLogging};
use atop::display::{display_benchmark_summary, display_status};
use atop::export::SessionReport;
use atop::preflight::run_preflight_checks;
use atop::queue::BoundedQueue;
use atop::shell::{AdbShell, HostShell, ShellExecutor};
use atop::sim::simulated_device;
use atop::streaming::{CpuStreamer, DmesgStreamer, LogcatStreamer, Pollers};
use atop::Session;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

const STATUS_INTERVAL: Duration = Duration::from_secs(2);

fn main() {
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects info, default is warn.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// Discover models, build the job for the configured framework and hand it
/// to the pool.
fn launch_benchmark(
    shell: &dyn ShellExecutor,
    runner: &BenchmarkRunner,
    config: &MonitorConfig,
) -> Result<BenchmarkHandle> {
    let models = models_on_device(shell, config.framework)
        .with_context(|| format!("Failed to list {} models", config.framework))?;
    let models = filter_for_delegate(models, config.framework, config.tflite.delegate);
    info!("{} candidate models for {}", models.len(), config.framework);

    let mut selector = config.seed.map_or_else(ModelSelector::from_entropy, ModelSelector::seeded);
    let job = job_for(
        config.framework,
        &models,
        &config.tflite,
        config.snpe.as_ref(),
        config.processes,
        &mut selector,
    )?;

    Ok(runner.launch(job)?)
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let quiet = args.quiet;
    let config = MonitorConfig::from_args(&args)?;

    // ── Device ──────────────────────────────────────────────────────────
    let (shell, device) = if args.sim {
        let shell: Arc<dyn ShellExecutor> = Arc::new(simulated_device());
        (shell, "sim".to_string())
    } else {
        let serial = run_preflight_checks(&HostShell)?;
        let shell: Arc<dyn ShellExecutor> = Arc::new(AdbShell::new(Some(serial.clone())));
        (shell, serial)
    };

    if !quiet {
        println!("atop v{}", env!("CARGO_PKG_VERSION"));
        println!("device: {device}");
        println!("framework: {}", config.framework);
    }

    let _kernel_logging = if args.no_kernel_logging {
        None
    } else {
        Some(KernelLogging::enable(Arc::clone(&shell)).context("Failed to enable kernel logging")?)
    };
    let _driver_logging = if args.driver_logging {
        Some(DriverLogging::enable(Arc::clone(&shell)).context("Failed to enable driver logging")?)
    } else {
        None
    };

    // ── Streamers and pollers ───────────────────────────────────────────
    let mut dmesg =
        DmesgStreamer::new(Arc::clone(&shell), &config.dmesg_probes, config.utilization_probe)
            .context("Failed to start kernel log streaming")?;
    let mut logcat = LogcatStreamer::new(Arc::clone(&shell), &config.logcat_probes)?;
    let mut cpu = CpuStreamer::new(Arc::clone(&shell));

    let dmesg_queue = Arc::new(BoundedQueue::new(config.queue_capacity));
    let logcat_queue = Arc::new(BoundedQueue::new(config.queue_capacity));
    let cpu_queue = Arc::new(BoundedQueue::new(config.queue_capacity));

    let mut pollers = Pollers::new();
    let (check_full_log, threshold) = (config.check_full_log, config.recency_threshold_secs);
    pollers.spawn("dmesg", config.dmesg_interval, Arc::clone(&dmesg_queue), move || {
        dmesg.interactions(check_full_log, threshold)?;
        Ok(dmesg.snapshot())
    })?;
    pollers.spawn("logcat", config.logcat_interval, Arc::clone(&logcat_queue), move || {
        logcat.more()?;
        Ok(logcat.snapshot())
    })?;
    pollers.spawn("cpu", config.cpu_interval, Arc::clone(&cpu_queue), move || {
        cpu.utilizations().cloned()
    })?;
    info!("{} pollers running", pollers.len());

    // ── Session and benchmarks ──────────────────────────────────────────
    let mut session = Session::new(config.framework, config.tflite.runs)?;
    let runner = BenchmarkRunner::new(Arc::clone(&shell), config.pool_size)?;

    if args.benchmark {
        let handle = launch_benchmark(shell.as_ref(), &runner, &config)?;
        session.track(handle);
        if !quiet {
            println!(
                "benchmark: {} x{} ({} runs)",
                config.framework, config.processes, config.tflite.runs
            );
        }
    }

    // Setup Ctrl+C handler
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let monitor_start = Instant::now();
    let duration_limit = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    let mut status_timer = Instant::now();
    let mut exit_reason = "interrupted";

    loop {
        if let Some(limit) = duration_limit {
            if monitor_start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        // Deltas must all be folded in; CPU only needs the newest reading
        while dmesg_queue.has_data() {
            if let Some(snapshot) = dmesg_queue.pop() {
                session.apply_dmesg(&snapshot);
            }
        }
        while logcat_queue.has_data() {
            if let Some(snapshot) = logcat_queue.pop() {
                session.apply_logcat(&snapshot);
            }
        }
        if let Some(utilization) = cpu_queue.drain_latest() {
            session.apply_cpu(utilization);
        }

        if session.poll_benchmarks() > 0 && !quiet {
            display_benchmark_summary(&session);
        }
        if args.exit_on_complete && session.pending_benchmarks() == 0 {
            exit_reason = "benchmarks complete";
            break;
        }

        if !quiet && status_timer.elapsed() >= STATUS_INTERVAL {
            display_status(&session, monitor_start.elapsed().as_secs());
            status_timer = Instant::now();
        }

        // Use select to handle both sleep and Ctrl+C
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    pollers.shutdown();
    let elapsed = monitor_start.elapsed().as_secs_f64();

    if !quiet {
        eprintln!(
            "\n{exit_reason}: {elapsed:.1}s, {} benchmarks completed, {} pending",
            session.completed_benchmarks(),
            session.pending_benchmarks(),
        );
        if session.completed_benchmarks() > 0 {
            display_benchmark_summary(&session);
        }
    }

    if let Some(ref export_path) = args.export {
        let report = SessionReport::from_session(&session, &device, elapsed);
        let file = File::create(export_path).context("Failed to create session report file")?;
        report.export(BufWriter::new(file)).context("Failed to export session report")?;
        if !quiet {
            println!("saved: {}", export_path.display());
        }
    }

    // Pending benchmarks are drained, not cancelled
    drop(runner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&anyhow::anyhow!("adb root: Permission denied")), EXIT_NOPERM);
        let usage = anyhow::anyhow!("Missing required argument: --benchmark");
        assert_eq!(exit_code_for(&usage), EXIT_USAGE);
        assert_eq!(exit_code_for(&anyhow::anyhow!("No devices connected")), EXIT_ERROR);
    }
}
