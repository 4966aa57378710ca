//! Bounded hand-off between a background poller and the foreground consumer.
//!
//! One producer thread pushes snapshots, one consumer thread drains them. The
//! capacity bounds how far the consumer may fall behind: once it is reached,
//! `push` blocks until the consumer pops.

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::time::Duration;

/// Default number of snapshots a queue holds before `push` blocks.
pub const DEFAULT_CAPACITY: usize = 10;

/// How often a blocked `push_while` re-checks its exit condition.
const PUSH_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Capacity-limited FIFO shared by exactly one producer and one consumer.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue that blocks producers once `capacity` items are queued.
    ///
    /// A capacity of zero is bumped to one; a rendezvous queue would make
    /// `has_data` meaningless.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Append `value`, blocking while the queue is full.
    pub fn push(&self, value: T) {
        // Both halves live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(value);
    }

    /// Append `value`, blocking while the queue is full and `keep_going`
    /// returns true.
    ///
    /// Returns false when the value was dropped because `keep_going` turned
    /// false first. Pollers use this so a full queue cannot keep them from
    /// seeing the shutdown flag.
    pub fn push_while(&self, mut value: T, keep_going: impl Fn() -> bool) -> bool {
        loop {
            match self.tx.send_timeout(value, PUSH_RETRY_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(v)) => {
                    if !keep_going() {
                        return false;
                    }
                    value = v;
                }
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Remove and return the oldest element.
    ///
    /// Callers must check [`has_data`](Self::has_data) first. `None` only
    /// comes back when that contract is broken; it is not a "try" API.
    pub fn pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Non-blocking emptiness check.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.rx.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pop everything currently queued and keep only the newest element.
    ///
    /// The consumer only ever renders the latest snapshot, older ones are
    /// superseded.
    pub fn drain_latest(&self) -> Option<T> {
        let mut latest = None;
        while self.has_data() {
            match self.pop() {
                Some(v) => latest = Some(v),
                None => break,
            }
        }
        latest
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let q = BoundedQueue::new(4);
        q.push(1);
        q.push(2);
        assert!(q.has_data());
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert!(!q.has_data());
    }

    #[test]
    fn test_eleventh_push_blocks_until_pop() {
        let q = Arc::new(BoundedQueue::new(DEFAULT_CAPACITY));
        for i in 0..10 {
            q.push(i);
        }
        assert_eq!(q.len(), 10);

        let pushed = Arc::new(AtomicBool::new(false));
        let producer = {
            let q = Arc::clone(&q);
            let pushed = Arc::clone(&pushed);
            thread::spawn(move || {
                q.push(10);
                pushed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!pushed.load(Ordering::SeqCst), "11th push should block");

        assert_eq!(q.pop(), Some(0));
        producer.join().unwrap();

        assert!(pushed.load(Ordering::SeqCst));
        assert!(q.has_data());
        assert_eq!(q.len(), 10);
    }

    #[test]
    fn test_push_while_gives_up() {
        let q = BoundedQueue::new(1);
        q.push("first");
        assert!(!q.push_while("second", || false));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_pop_empty_is_none() {
        let q: BoundedQueue<u8> = BoundedQueue::default();
        assert_eq!(q.pop(), None);
        assert_eq!(q.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_drain_latest() {
        let q = BoundedQueue::new(3);
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.drain_latest(), Some(3));
        assert!(q.is_empty());
        assert_eq!(q.drain_latest(), None);
    }
}
