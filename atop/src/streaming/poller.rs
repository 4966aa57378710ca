//! Background poll loops
//!
//! Each streamer is owned by exactly one thread that polls it on a fixed
//! interval and publishes a snapshot into that streamer's bounded queue. The
//! foreground never touches a streamer directly.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::domain::AtopError;
use crate::queue::BoundedQueue;

pub const DMESG_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const LOGCAT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const CPU_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Granularity at which a sleeping poller notices the exit flag.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Sleep for `interval`, returning early once `exit` is set.
fn sleep_unless_exit(interval: Duration, exit: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !exit.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Spawn a named thread running `poll` every `interval` until `exit` is set.
///
/// Successful polls are pushed into `queue` (blocking while it is full). A
/// failed poll is logged and the loop carries on with the next interval.
///
/// # Errors
/// The OS refused to spawn the thread.
pub fn spawn_poller<S, F>(
    name: &str,
    interval: Duration,
    exit: Arc<AtomicBool>,
    queue: Arc<BoundedQueue<S>>,
    mut poll: F,
) -> Result<JoinHandle<()>, AtopError>
where
    S: Send + 'static,
    F: FnMut() -> Result<S, AtopError> + Send + 'static,
{
    let label = name.to_string();
    let handle = thread::Builder::new().name(format!("atop-{name}")).spawn(move || {
        debug!("{label} poller started ({interval:?})");
        while !exit.load(Ordering::Relaxed) {
            match poll() {
                Ok(snapshot) => {
                    if !queue.push_while(snapshot, || !exit.load(Ordering::Relaxed)) {
                        break;
                    }
                }
                Err(e) => warn!("{label} poll failed: {e}"),
            }
            sleep_unless_exit(interval, &exit);
        }
        debug!("{label} poller stopped");
    })?;
    Ok(handle)
}

/// The set of running pollers sharing one exit flag.
#[derive(Debug, Default)]
pub struct Pollers {
    exit: Arc<AtomicBool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Pollers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a poller that stops when [`shutdown`](Self::shutdown) is called.
    ///
    /// # Errors
    /// See [`spawn_poller`].
    pub fn spawn<S, F>(
        &mut self,
        name: &str,
        interval: Duration,
        queue: Arc<BoundedQueue<S>>,
        poll: F,
    ) -> Result<(), AtopError>
    where
        S: Send + 'static,
        F: FnMut() -> Result<S, AtopError> + Send + 'static,
    {
        let handle = spawn_poller(name, interval, Arc::clone(&self.exit), queue, poll)?;
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Raise the exit flag and join every poller.
    pub fn shutdown(&mut self) {
        self.exit.store(true, Ordering::Relaxed);
        for (name, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("{name} poller panicked");
            }
        }
    }
}

impl Drop for Pollers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExecutionError;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_poller_publishes_and_stops() {
        let queue = Arc::new(BoundedQueue::new(4));
        let mut pollers = Pollers::new();
        let mut n = 0u32;
        pollers
            .spawn("counter", Duration::from_millis(5), Arc::clone(&queue), move || {
                n += 1;
                Ok(n)
            })
            .unwrap();

        let started = Instant::now();
        while !queue.has_data() && started.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(5));
        }
        pollers.shutdown();

        assert_eq!(queue.pop(), Some(1));
        assert!(pollers.is_empty());
    }

    #[test]
    fn test_poll_errors_do_not_stop_loop() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(4));
        let calls = Arc::new(AtomicU32::new(0));
        let mut pollers = Pollers::new();
        {
            let calls = Arc::clone(&calls);
            pollers
                .spawn("flaky", Duration::from_millis(5), Arc::clone(&queue), move || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(ExecutionError::PoolClosed.into())
                    } else {
                        Ok(n)
                    }
                })
                .unwrap();
        }

        let started = Instant::now();
        while !queue.has_data() && started.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(5));
        }
        pollers.shutdown();

        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn test_shutdown_with_full_queue() {
        let queue = Arc::new(BoundedQueue::new(1));
        let mut pollers = Pollers::new();
        pollers.spawn("busy", Duration::ZERO, Arc::clone(&queue), || Ok(0u8)).unwrap();

        thread::sleep(Duration::from_millis(50));
        // The poller is now blocked on the full queue; shutdown must still join it.
        pollers.shutdown();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_sleep_returns_early_on_exit() {
        let exit = AtomicBool::new(true);
        let started = Instant::now();
        sleep_unless_exit(Duration::from_secs(5), &exit);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
