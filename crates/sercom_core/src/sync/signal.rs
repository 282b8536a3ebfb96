//! # Sticky Signals
//!
//! A latched binary flag. Once raised it stays raised until the waiting side
//! consumes it, so a raise that happens before the waiter arrives is never
//! lost.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// Latched flag with a blocking, consuming wait.
#[derive(Debug, Default)]
pub struct StickySignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl StickySignal {
    /// Creates a lowered signal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raised: parking_lot::const_mutex(false),
            condvar: Condvar::new(),
        }
    }

    /// Raises the signal and wakes the waiter, if any.
    pub fn raise(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.condvar.notify_one();
    }

    /// Blocks until the signal is raised, then lowers it.
    ///
    /// There is no timeout.
    pub fn wait(&self) {
        let mut raised = self.raised.lock();
        while !*raised {
            self.condvar.wait(&mut raised);
        }
        *raised = false;
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Returns `true` if the signal was raised and has been consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut raised = self.raised.lock();
        if !*raised {
            // wait_while_for handles spurious wake-ups against the deadline
            let _ = self
                .condvar
                .wait_while_for(&mut raised, |raised| !*raised, timeout);
        }
        let consumed = *raised;
        *raised = false;
        consumed
    }

    /// Lowers the signal without waiting.
    pub fn clear(&self) {
        *self.raised.lock() = false;
    }

    /// Returns whether the signal is currently raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.raised.lock()
    }
}
