use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of the dispatch loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// Constructed, `start` not called yet.
    #[default]
    Idle,
    Running,
    /// `stop` was called; executing what was queued before it.
    Draining,
    /// The loop has exited and every worker has finished.
    Stopped,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Live counters shared by the loop, the workers and the executor.
#[derive(Debug, Default)]
pub struct DispatchStats {
    executed: AtomicU64,
    failed: AtomicU64,
    delegated: AtomicU64,
    inline: AtomicU64,
    caller_runs: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delegated(&self) {
        self.delegated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inline(&self) {
        self.inline.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_caller_runs(&self) {
        self.caller_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            delegated: self.delegated.load(Ordering::Relaxed),
            inline: self.inline.load(Ordering::Relaxed),
            caller_runs: self.caller_runs.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `DispatchStats`, as reported by the status endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DispatchStatsSnapshot {
    /// Jobs whose execution finished without error.
    pub executed: u64,
    /// Jobs whose execution ended in a `JobError`, interruptions included.
    pub failed: u64,
    /// Jobs routed to the worker pool.
    pub delegated: u64,
    /// Jobs executed inline after waiting for capabilities.
    pub inline: u64,
    /// Pool-routed jobs that ran on the loop because no worker was free.
    pub caller_runs: u64,
    /// Queued jobs discarded by an abort.
    pub dropped: u64,
}
