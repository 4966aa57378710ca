//! Benchmark worker pool.
//!
//! Benchmarks run for seconds to minutes, so they are executed on a small,
//! explicitly owned pool of threads. Each launch returns a
//! [`BenchmarkHandle`] the foreground can poll without blocking.
//!
//! ```text
//! launch(job) ──► job channel ──► worker N ──► shell.execute(...)
//!     │                                             │
//!     └── BenchmarkHandle ◄──── reply channel ◄─────┘
//! ```

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::domain::{AtopError, ExecutionError, Framework};
use crate::shell::{ShellExecutor, ShellOutput};

pub const DEFAULT_POOL_SIZE: usize = 8;

/// Poll a command until its output contains `needle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitCondition {
    pub command: String,
    pub needle: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Shell work making up one benchmark session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkJob {
    pub framework: Framework,
    /// Executed in order; their combined output is the raw result.
    pub run: Vec<String>,
    /// Completion signal for tools that return before the benchmark ends.
    pub wait_for: Option<WaitCondition>,
    /// When non-empty, the concatenated output of these replaces the raw result.
    pub post: Vec<String>,
}

impl BenchmarkJob {
    #[must_use]
    pub fn new(framework: Framework, run: Vec<String>) -> Self {
        Self {
            framework,
            run,
            wait_for: None,
            post: Vec::new(),
        }
    }

    #[must_use]
    pub fn wait_for(mut self, condition: WaitCondition) -> Self {
        self.wait_for = Some(condition);
        self
    }

    #[must_use]
    pub fn post(mut self, commands: Vec<String>) -> Self {
        self.post = commands;
        self
    }
}

/// Output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkOutput {
    pub framework: Framework,
    pub lines: ShellOutput,
}

pub type JobResult = Result<BenchmarkOutput, ExecutionError>;

fn run_all(shell: &dyn ShellExecutor, commands: &[String]) -> Result<ShellOutput, ExecutionError> {
    let mut lines = Vec::new();
    for cmd in commands {
        debug!("benchmark: {cmd}");
        lines.extend(shell.execute(cmd)?);
    }
    Ok(lines)
}

fn wait_until(shell: &dyn ShellExecutor, condition: &WaitCondition) -> Result<(), ExecutionError> {
    let started = Instant::now();
    loop {
        let out = shell.execute(&condition.command)?;
        if out.iter().any(|line| line.contains(&condition.needle)) {
            return Ok(());
        }
        if started.elapsed() >= condition.timeout {
            warn!("Timed out after {:?} waiting for {:?}", condition.timeout, condition.needle);
            return Ok(());
        }
        thread::sleep(condition.poll_interval);
    }
}

/// Run `job` to completion on the calling thread.
///
/// # Errors
/// The first command that fails to spawn.
pub fn execute_job(shell: &dyn ShellExecutor, job: &BenchmarkJob) -> JobResult {
    let raw = run_all(shell, &job.run)?;
    if let Some(ref condition) = job.wait_for {
        wait_until(shell, condition)?;
    }
    let lines = if job.post.is_empty() { raw } else { run_all(shell, &job.post)? };
    Ok(BenchmarkOutput {
        framework: job.framework,
        lines,
    })
}

// =============================================================================
// HANDLE
// =============================================================================

/// Pending result of a launched job.
#[derive(Debug)]
pub struct BenchmarkHandle {
    framework: Framework,
    rx: Receiver<JobResult>,
    result: Option<JobResult>,
    /// A result (or disconnect) has been received.
    finished: bool,
}

impl BenchmarkHandle {
    #[must_use]
    pub fn framework(&self) -> Framework {
        self.framework
    }

    /// Non-blocking completion check. False again once the result was taken.
    pub fn is_ready(&mut self) -> bool {
        if !self.finished {
            match self.rx.try_recv() {
                Ok(result) => self.result = Some(result),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    self.result = Some(Err(ExecutionError::PoolClosed));
                }
            }
            self.finished = true;
        }
        self.result.is_some()
    }

    /// Take the result if it is available.
    pub fn try_take(&mut self) -> Option<JobResult> {
        if self.is_ready() {
            self.result.take()
        } else {
            None
        }
    }

    /// Block until the job finishes.
    ///
    /// # Errors
    /// The job's own failure, or `ExecutionError::PoolClosed` if the pool went
    /// away before answering.
    pub fn wait(mut self) -> JobResult {
        if let Some(result) = self.result.take() {
            return result;
        }
        if self.finished {
            return Err(ExecutionError::PoolClosed);
        }
        self.rx.recv().unwrap_or(Err(ExecutionError::PoolClosed))
    }
}

// =============================================================================
// RUNNER
// =============================================================================

type Task = (BenchmarkJob, Sender<JobResult>);

/// Fixed-size pool of benchmark workers.
///
/// Dropping the runner closes the job queue and joins the workers once they
/// finish what is already queued.
pub struct BenchmarkRunner {
    tx: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl BenchmarkRunner {
    /// Start `pool_size` workers (at least one) sharing `shell`.
    ///
    /// # Errors
    /// The OS refused to spawn a worker thread.
    pub fn new(shell: Arc<dyn ShellExecutor>, pool_size: usize) -> Result<Self, AtopError> {
        let (tx, rx) = unbounded::<Task>();
        let mut workers = Vec::with_capacity(pool_size.max(1));

        for id in 0..pool_size.max(1) {
            let rx = rx.clone();
            let shell = Arc::clone(&shell);
            let worker = thread::Builder::new().name(format!("atop-bench-{id}")).spawn(move || {
                for (job, reply) in rx.iter() {
                    let result = execute_job(shell.as_ref(), &job);
                    if let Err(ref e) = result {
                        warn!("Benchmark failed: {e}");
                    }
                    // The handle may have been dropped; nothing to report to.
                    let _ = reply.send(result);
                }
            })?;
            workers.push(worker);
        }

        Ok(Self {
            tx: Some(tx),
            workers,
        })
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `job` and return a handle to its result.
    ///
    /// # Errors
    /// `ExecutionError::PoolClosed` when every worker has exited.
    pub fn launch(&self, job: BenchmarkJob) -> Result<BenchmarkHandle, ExecutionError> {
        let framework = job.framework;
        let (reply_tx, reply_rx) = bounded(1);
        let tx = self.tx.as_ref().ok_or(ExecutionError::PoolClosed)?;
        tx.send((job, reply_tx)).map_err(|_| ExecutionError::PoolClosed)?;
        Ok(BenchmarkHandle {
            framework,
            rx: reply_rx,
            result: None,
            finished: false,
        })
    }
}

impl Drop for BenchmarkRunner {
    fn drop(&mut self) {
        drop(self.tx.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Benchmark worker panicked");
            }
        }
    }
}
