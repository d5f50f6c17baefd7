//! Wake signals for the view producer loop
//!
//! [`ReleaseGate`] is the single-slot wake signal the producer loop sleeps
//! on: any number of releases between wakes coalesce into one pending wake,
//! so a burst of page-loaded callbacks never queues up stale work.
//! [`Latch`] is the one-shot "first content visible" signal the orchestrator
//! waits on with a bounded timeout.

use crate::cancel::CancellationToken;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Coalescing single-slot wake signal
///
/// `release()` marks work pending and wakes one waiter. Releases that arrive
/// while no one is waiting are not counted, only remembered: the next
/// `wait()` returns immediately and consumes the pending mark.
///
/// Cancellation contract: the owner must call `release()` after cancelling
/// the token so a blocked waiter wakes up and observes the cancellation.
///
/// # Example
///
/// ```
/// use book_viewer_scheduler::{CancellationToken, ReleaseGate};
///
/// let gate = ReleaseGate::new();
/// let token = CancellationToken::new();
///
/// gate.release();
/// gate.release(); // coalesces with the first
/// assert!(gate.wait(&token)); // consumes the single pending wake
/// ```
pub struct ReleaseGate {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl ReleaseGate {
    /// Create a gate with no pending wake.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Mark work pending and wake a waiter.
    pub fn release(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending = true;
        self.condvar.notify_one();
    }

    /// Block until work is pending, then consume the pending mark.
    ///
    /// Returns `false` if the token was cancelled, `true` otherwise.
    pub fn wait(&self, token: &CancellationToken) -> bool {
        let mut pending = self.pending.lock().unwrap();
        while !*pending {
            if token.is_cancelled() {
                return false;
            }
            pending = self.condvar.wait(pending).unwrap();
        }
        *pending = false;
        !token.is_cancelled()
    }

    /// Whether a wake is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        *self.pending.lock().unwrap()
    }
}

impl Default for ReleaseGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a bounded latch wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchWait {
    /// The latch opened within the timeout.
    Opened,

    /// The timeout elapsed first.
    TimedOut,

    /// The token was cancelled first.
    Cancelled,
}

/// One-shot open latch with a bounded wait
///
/// Opens once and stays open. The orchestrator waits on it for the first
/// visible content of a session; on timeout it falls back to a forced
/// publish instead of blocking the caller further.
pub struct Latch {
    opened: Mutex<bool>,
    condvar: Condvar,
}

impl Latch {
    /// Create a closed latch.
    pub fn new() -> Self {
        Self {
            opened: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Open the latch and wake all waiters. Idempotent.
    pub fn open(&self) {
        let mut opened = self.opened.lock().unwrap();
        *opened = true;
        self.condvar.notify_all();
    }

    /// Whether the latch has opened.
    pub fn is_open(&self) -> bool {
        *self.opened.lock().unwrap()
    }

    /// Wake all waiters without opening, so they can re-check cancellation.
    pub fn kick(&self) {
        let _guard = self.opened.lock().unwrap();
        self.condvar.notify_all();
    }

    /// Wait for the latch to open, bounded by `timeout` and by the token.
    pub fn wait_timeout(&self, timeout: Duration, token: &CancellationToken) -> LatchWait {
        let deadline = Instant::now() + timeout;
        let mut opened = self.opened.lock().unwrap();
        loop {
            if *opened {
                return LatchWait::Opened;
            }
            if token.is_cancelled() {
                return LatchWait::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return LatchWait::TimedOut;
            }
            let (guard, _) = self.condvar.wait_timeout(opened, deadline - now).unwrap();
            opened = guard;
        }
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_gate_release_before_wait() {
        let gate = ReleaseGate::new();
        let token = CancellationToken::new();

        gate.release();
        assert!(gate.is_pending());
        assert!(gate.wait(&token));
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_gate_coalesces_releases() {
        let gate = ReleaseGate::new();
        let token = CancellationToken::new();

        gate.release();
        gate.release();
        gate.release();

        assert!(gate.wait(&token));
        // Only one wake was pending.
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_gate_wakes_blocked_waiter() {
        let gate = Arc::new(ReleaseGate::new());
        let token = CancellationToken::new();

        let waiter = {
            let gate = Arc::clone(&gate);
            let token = token.clone();
            thread::spawn(move || gate.wait(&token))
        };

        thread::sleep(Duration::from_millis(20));
        gate.release();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_gate_cancel_then_release_unblocks() {
        let gate = Arc::new(ReleaseGate::new());
        let token = CancellationToken::new();

        let waiter = {
            let gate = Arc::clone(&gate);
            let token = token.clone();
            thread::spawn(move || gate.wait(&token))
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        gate.release();
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn test_latch_open_before_wait() {
        let latch = Latch::new();
        let token = CancellationToken::new();

        latch.open();
        assert!(latch.is_open());
        assert_eq!(
            latch.wait_timeout(Duration::from_millis(10), &token),
            LatchWait::Opened
        );
    }

    #[test]
    fn test_latch_timeout() {
        let latch = Latch::new();
        let token = CancellationToken::new();

        let started = Instant::now();
        let result = latch.wait_timeout(Duration::from_millis(30), &token);
        assert_eq!(result, LatchWait::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_latch_cancelled() {
        let latch = Latch::new();
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(
            latch.wait_timeout(Duration::from_millis(100), &token),
            LatchWait::Cancelled
        );
    }

    #[test]
    fn test_latch_opened_from_other_thread() {
        let latch = Arc::new(Latch::new());
        let token = CancellationToken::new();

        let opener = {
            let latch = Arc::clone(&latch);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                latch.open();
            })
        };

        let result = latch.wait_timeout(Duration::from_secs(5), &token);
        assert_eq!(result, LatchWait::Opened);
        opener.join().unwrap();
    }

    #[test]
    fn test_latch_kick_wakes_for_cancellation() {
        let latch = Arc::new(Latch::new());
        let token = CancellationToken::new();

        let waiter = {
            let latch = Arc::clone(&latch);
            let token = token.clone();
            thread::spawn(move || latch.wait_timeout(Duration::from_secs(5), &token))
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        latch.kick();
        assert_eq!(waiter.join().unwrap(), LatchWait::Cancelled);
    }

    #[test]
    fn test_latch_open_is_idempotent() {
        let latch = Latch::new();
        latch.open();
        latch.open();
        assert!(latch.is_open());
    }
}
