use crate::error::TransportError;
use crate::job::types::{Capability, Job, JobBehavior, JobId, JobOrigin};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current wire version of `JobEnvelope`. Anything else is treated as malformed.
pub const ENVELOPE_VERSION: u8 = 1;

/// Transport priority range (inclusive).
pub const MIN_TRANSPORT_PRIORITY: u8 = 0;
pub const MAX_TRANSPORT_PRIORITY: u8 = 9;

/// Binary wire form of a `Job`.
///
/// The job payload travels as a JSON string: bincode cannot carry a self-describing
/// `serde_json::Value`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobEnvelope {
    pub version: u8,
    pub id: String,
    pub kind: String,
    pub payload_json: String,
    pub priority: i32,
    pub durable: bool,
    pub required_capabilities: Vec<String>,
    pub behavior: JobBehavior,
    pub timestamp_ms: u64,
    pub origin: JobOrigin,
    pub shard_key: Option<String>,
}

impl JobEnvelope {
    pub fn from_job(job: &Job) -> Result<Self, TransportError> {
        let payload_json = serde_json::to_string(&job.payload)
            .map_err(|e| TransportError::Encode(e.to_string()))?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            id: job.id.0.clone(),
            kind: job.kind.clone(),
            payload_json,
            priority: job.priority(),
            durable: job.durable,
            required_capabilities: job
                .required_capabilities
                .iter()
                .map(|c| c.0.clone())
                .collect(),
            behavior: job.behavior(),
            timestamp_ms: job.timestamp_ms,
            origin: job.origin,
            shard_key: job.shard_key.clone(),
        })
    }

    pub fn into_job(self) -> Result<Job, TransportError> {
        let payload = serde_json::from_str(&self.payload_json)
            .map_err(|e| TransportError::Decode(format!("payload: {}", e)))?;

        let mut job = Job::new(self.kind, payload)
            .with_priority(self.priority)
            .with_behavior(self.behavior)
            .durable(self.durable);
        job.id = JobId(self.id);
        job.required_capabilities = self
            .required_capabilities
            .into_iter()
            .map(Capability)
            .collect();
        job.timestamp_ms = self.timestamp_ms;
        job.origin = self.origin;
        job.shard_key = self.shard_key;
        Ok(job)
    }

    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        bincode::serialize(self).map_err(|e| TransportError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        let envelope: Self =
            bincode::deserialize(bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(TransportError::Decode(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

/// Encodes `job` into the bytes a transport carries.
pub fn encode_job(job: &Job) -> Result<Vec<u8>, TransportError> {
    JobEnvelope::from_job(job)?.encode()
}

/// Decodes transport bytes back into a `Job`.
pub fn decode_job(bytes: &[u8]) -> Result<Job, TransportError> {
    JobEnvelope::decode(bytes)?.into_job()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Survives a broker restart.
    Persistent,
    NonPersistent,
}

impl DeliveryMode {
    pub fn for_job(job: &Job) -> Self {
        if job.durable {
            DeliveryMode::Persistent
        } else {
            DeliveryMode::NonPersistent
        }
    }
}

/// One message handed to a `Publisher`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub delivery: DeliveryMode,
    /// Always within `MIN_TRANSPORT_PRIORITY..=MAX_TRANSPORT_PRIORITY`.
    pub priority: u8,
    pub ttl: Option<Duration>,
}

/// Maps a job priority onto the transport's range.
pub fn clamp_priority(priority: i32) -> u8 {
    priority.clamp(MIN_TRANSPORT_PRIORITY as i32, MAX_TRANSPORT_PRIORITY as i32) as u8
}
