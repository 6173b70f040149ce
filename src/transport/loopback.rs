//! In-process transport.
//!
//! Committed messages go through an unbounded channel to a delivery task that calls the
//! attached `MessageListener`, in commit order. Used for loop-back submission on a single node
//! and in tests.

use super::egress::{PublishTransaction, Publisher};
use super::ingress::MessageListener;
use super::types::OutboundMessage;
use crate::error::TransportError;

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Delivery {
    message: OutboundMessage,
    committed_at: Instant,
}

pub struct LoopbackTransport {
    sender: Mutex<Option<mpsc::UnboundedSender<Delivery>>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Delivery>>>,
    committed: Arc<AtomicU64>,
    expired: Arc<AtomicU64>,
}

impl LoopbackTransport {
    pub fn new() -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            committed: Arc::new(AtomicU64::new(0)),
            expired: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Starts delivering to `listener`. Only one listener can be attached.
    ///
    /// The delivery task ends after `shutdown`, once every committed message is delivered,
    /// and then calls `listener.close()`.
    pub fn attach(
        &self,
        listener: Arc<dyn MessageListener>,
    ) -> Result<JoinHandle<()>, TransportError> {
        let mut receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| TransportError::Publish("listener already attached".to_string()))?;
        let expired = self.expired.clone();

        Ok(tokio::spawn(async move {
            while let Some(delivery) = receiver.recv().await {
                if let Some(ttl) = delivery.message.ttl {
                    if delivery.committed_at.elapsed() >= ttl {
                        tracing::debug!("Dropping expired message (ttl {:?})", ttl);
                        expired.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                }
                listener.on_structured(&delivery.message.body);
            }
            listener.close();
        }))
    }

    /// Refuses new transactions. Already committed messages are still delivered.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_some() {
            tracing::info!("Loopback transport shut down");
        }
    }

    /// Messages committed so far.
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    /// Committed messages dropped because their TTL ran out before delivery.
    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}

impl Publisher for LoopbackTransport {
    fn begin(&self) -> Result<Box<dyn PublishTransaction>, TransportError> {
        let sender = self.sender.lock().clone().ok_or(TransportError::Closed)?;
        Ok(Box::new(LoopbackTransaction {
            sender,
            pending: Vec::new(),
            committed: self.committed.clone(),
        }))
    }
}

struct LoopbackTransaction {
    sender: mpsc::UnboundedSender<Delivery>,
    pending: Vec<OutboundMessage>,
    committed: Arc<AtomicU64>,
}

impl PublishTransaction for LoopbackTransaction {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        if self.sender.is_closed() {
            return Err(TransportError::Closed);
        }
        self.pending.push(message);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), TransportError> {
        let committed_at = Instant::now();
        for message in self.pending.drain(..) {
            self.sender
                .send(Delivery {
                    message,
                    committed_at,
                })
                .map_err(|_| {
                    TransportError::Commit("delivery channel closed mid-commit".to_string())
                })?;
            self.committed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!("Rolling back {} unsent messages", self.pending.len());
        }
        self.pending.clear();
    }
}
