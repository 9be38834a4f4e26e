//! Cooperative cancellation for background work.
//!
//! Long-running operations (the optimizer's retry sleeps, maintenance
//! sweeps) check a shared token between blocking points. The token is
//! condvar-backed so a sleeping waiter wakes as soon as cancellation is
//! requested instead of running out its timeout.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    cond: Condvar,
}

/// Shared cancellation token. Cloning is cheap; all clones observe the same
/// cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake all sleeping waiters.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        *cancelled = true;
        self.inner.cond.notify_all();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap()
    }

    /// Sleep up to `timeout`, returning early when cancelled.
    ///
    /// Returns `true` if cancellation was requested, `false` if the full
    /// timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        loop {
            if *cancelled {
                return true;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(cancelled, deadline - now)
                .unwrap();
            cancelled = guard;
        }
    }
}
