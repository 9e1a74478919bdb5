//! A resettable one-shot flag that threads can wait on with a timeout.
//!
//! Used as the stop request for task workers and as the completion signal
//! for executor jobs. Every wait is bounded.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Boolean latch guarded by a mutex/condvar pair.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    /// Current state.
    set: Mutex<bool>,
    /// Notified on every transition to `true`.
    cond: Condvar,
}

impl Signal {
    /// Create a cleared signal.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set the signal and wake every waiter. Returns `false` if it was already set.
    pub(crate) fn set(&self) -> bool {
        let mut g = self.set.lock();
        if *g {
            return false;
        }
        *g = true;
        self.cond.notify_all();
        true
    }

    /// Clear the signal for reuse.
    pub(crate) fn reset(&self) {
        *self.set.lock() = false;
    }

    /// Current state without waiting.
    pub(crate) fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Wait up to `timeout` for the signal. Returns the state at return.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_deadline(deadline),
            None => self.wait(),
        }
    }

    /// Wait until `deadline` for the signal. Returns the state at return.
    pub(crate) fn wait_deadline(&self, deadline: Instant) -> bool {
        let mut g = self.set.lock();
        while !*g {
            if self.cond.wait_until(&mut g, deadline).timed_out() {
                break;
            }
        }
        *g
    }

    /// Wait without a deadline. Only used for durations too large to represent.
    fn wait(&self) -> bool {
        let mut g = self.set.lock();
        while !*g {
            self.cond.wait(&mut g);
        }
        true
    }
}
