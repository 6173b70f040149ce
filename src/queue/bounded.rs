use crate::job::types::Job;

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::pin::pin;
use tokio::sync::Notify;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 20;

/// A job plus its arrival sequence number.
///
/// The sequence is the tie-breaker: on equal priority the lower sequence wins.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub sequence: u64,
    pub job: Job,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.job.priority() == other.job.priority() && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// `Less` means "dispatched earlier": higher priority first, then earlier sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.job.priority().cmp(&self.job.priority()) {
            Ordering::Equal => self.sequence.cmp(&other.sequence),
            ordering => ordering,
        }
    }
}

struct Inner {
    entries: BTreeSet<QueueEntry>,
    next_sequence: u64,
    closed: bool,
}

/// Thread-safe, capacity-bounded priority queue with lowest-priority eviction.
pub struct BoundedPriorityQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    available: Notify,
}

impl BoundedPriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: BTreeSet::new(),
                next_sequence: 0,
                closed: false,
            }),
            capacity: capacity.max(1),
            available: Notify::new(),
        }
    }

    /// Inserts `job`, evicting the worst entry if the queue goes over capacity.
    ///
    /// Returns `true` if the job is resident afterwards, `false` if it was itself the
    /// evicted entry or the queue is closed. Never blocks.
    pub fn offer(&self, job: Job) -> bool {
        let accepted = {
            let mut inner = self.inner.lock();
            if inner.closed {
                tracing::debug!(job_id = %job.id, "Queue closed, rejecting job");
                return false;
            }

            let sequence = inner.next_sequence;
            inner.next_sequence += 1;
            inner.entries.insert(QueueEntry { sequence, job });

            if inner.entries.len() > self.capacity {
                match inner.entries.pop_last() {
                    Some(evicted) => {
                        tracing::debug!(
                            job_id = %evicted.job.id,
                            priority = evicted.job.priority(),
                            "Queue over capacity, evicted lowest priority job"
                        );
                        evicted.sequence != sequence
                    }
                    None => true,
                }
            } else {
                true
            }
        };

        if accepted {
            self.available.notify_one();
        }
        accepted
    }

    /// Waits for the best entry. Returns `None` once the queue is closed and empty.
    pub async fn take(&self) -> Option<QueueEntry> {
        loop {
            let mut notified = pin!(self.available.notified());
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(entry) = inner.entries.pop_first() {
                    return Some(entry);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Removes up to `max` entries in dispatch order without waiting.
    pub fn drain_up_to(&self, max: usize) -> Vec<QueueEntry> {
        let mut inner = self.inner.lock();
        let count = max.min(inner.entries.len());
        let mut batch = Vec::with_capacity(count);
        while batch.len() < count {
            match inner.entries.pop_first() {
                Some(entry) => batch.push(entry),
                None => break,
            }
        }
        batch
    }

    /// Stops accepting new entries and wakes every blocked `take`. Idempotent.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BoundedPriorityQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
