//! Per-client execution counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by all executions of one client.
#[derive(Debug, Default)]
pub struct ClientStats {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl ClientStats {
    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a client's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientStatsSnapshot {
    /// Executions accepted by `execute`.
    pub dispatched: u64,
    /// Executions resolved by a successful handler result.
    pub succeeded: u64,
    /// Executions resolved by a handler-produced error (either path).
    pub failed: u64,
    /// Executions resolved by cancellation.
    pub cancelled: u64,
}
