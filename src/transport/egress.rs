use super::types::{DeliveryMode, OutboundMessage, clamp_priority, encode_job};
use crate::error::TransportError;
use crate::job::types::Job;

use std::sync::Arc;
use std::time::Duration;

/// Producing side of the transport.
pub trait Publisher: Send + Sync {
    fn begin(&self) -> Result<Box<dyn PublishTransaction>, TransportError>;
}

/// A transactional publish context. Nothing sent is visible until `commit` succeeds.
pub trait PublishTransaction: Send {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;
    fn commit(&mut self) -> Result<(), TransportError>;
    fn rollback(&mut self);
}

/// Publishes jobs onto the transport, one transaction per job.
pub struct EgressAdapter {
    publisher: Arc<dyn Publisher>,
    ttl: Option<Duration>,
}

impl EgressAdapter {
    pub fn new(publisher: Arc<dyn Publisher>) -> Arc<Self> {
        Self::with_ttl(publisher, None)
    }

    /// Creates an adapter that stamps every outbound message with `ttl`.
    ///
    /// # Arguments
    /// * `publisher` - Transport the jobs are published to.
    /// * `ttl` - Time a committed message may wait for delivery. `None` never expires.
    pub fn with_ttl(publisher: Arc<dyn Publisher>, ttl: Option<Duration>) -> Arc<Self> {
        Arc::new(Self { publisher, ttl })
    }

    /// Serializes and publishes `job`.
    ///
    /// `priority_override` replaces the job's own priority on the transport only; the job
    /// itself is not modified. Any failure rolls the transaction back before returning.
    pub fn submit(&self, job: &Job, priority_override: Option<i32>) -> Result<(), TransportError> {
        let mut tx = self.publisher.begin()?;

        match self.publish(&mut tx, job, priority_override) {
            Ok(()) => {
                tracing::debug!(job_id = %job.id, kind = %job.kind, "Job published");
                Ok(())
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, "Publish failed, rolling back: {}", e);
                tx.rollback();
                Err(e)
            }
        }
    }

    fn publish(
        &self,
        tx: &mut Box<dyn PublishTransaction>,
        job: &Job,
        priority_override: Option<i32>,
    ) -> Result<(), TransportError> {
        let message = OutboundMessage {
            body: encode_job(job)?,
            delivery: DeliveryMode::for_job(job),
            priority: clamp_priority(priority_override.unwrap_or(job.priority())),
            ttl: self.ttl,
        };
        tx.send(message)?;
        tx.commit()
    }
}
