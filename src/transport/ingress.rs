use super::types::decode_job;
use crate::queue::BoundedPriorityQueue;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Callbacks a transport invokes on message delivery.
///
/// Implementations must return promptly and never panic: they run on the transport's
/// delivery thread.
pub trait MessageListener: Send + Sync {
    fn on_text(&self, text: &str);
    fn on_structured(&self, body: &[u8]);
    /// The transport is going away; no further callbacks follow.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IngressStats {
    pub accepted: u64,
    /// Decoded but evicted on offer, or refused by a closed queue.
    pub rejected: u64,
    pub malformed: u64,
    /// Arrived while ingress was stopped.
    pub discarded: u64,
}

/// Turns transport messages into queued jobs.
pub struct IngressAdapter {
    queue: Arc<BoundedPriorityQueue>,
    accepting: AtomicBool,
    accepted: AtomicU64,
    rejected: AtomicU64,
    malformed: AtomicU64,
    discarded: AtomicU64,
}

impl IngressAdapter {
    /// Created accepting.
    pub fn new(queue: Arc<BoundedPriorityQueue>) -> Arc<Self> {
        Arc::new(Self {
            queue,
            accepting: AtomicBool::new(true),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        })
    }

    /// Resumes accepting. Returns `false` if it already was.
    pub fn start(&self) -> bool {
        let changed = !self.accepting.swap(true, Ordering::SeqCst);
        if changed {
            tracing::info!("Ingress started");
        }
        changed
    }

    /// Stops accepting; later messages are discarded. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        let changed = self.accepting.swap(false, Ordering::SeqCst);
        if changed {
            tracing::info!("Ingress stopped");
        }
        changed
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> IngressStats {
        IngressStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

impl MessageListener for IngressAdapter {
    fn on_text(&self, text: &str) {
        tracing::warn!(
            "Discarding text message ({} bytes): only binary job envelopes are accepted",
            text.len()
        );
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_structured(&self, body: &[u8]) {
        if !self.is_accepting() {
            tracing::warn!("Ingress stopped, discarding message ({} bytes)", body.len());
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let job = match decode_job(body) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("Discarding malformed message: {}", e);
                self.malformed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let job_id = job.id.clone();
        if self.queue.offer(job) {
            tracing::debug!(%job_id, "Job enqueued");
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            tracing::debug!(%job_id, "Job not enqueued (evicted or queue closed)");
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn close(&self) {
        tracing::info!("Transport closed, ingress stopping");
        self.accepting.store(false, Ordering::SeqCst);
    }
}
