//! Error Taxonomy
//!
//! One enum per failure domain. Malformed transport input and job failures are
//! recovered where they happen (logged, never propagated past the loop); routing,
//! transport and admin errors surface to the caller as typed values.

use crate::cluster::types::MemberAddress;
use crate::job::types::Capability;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single job execution, passed to `after_execute`.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("No handler registered for job kind '{0}'")]
    UnknownHandler(String),

    #[error("Capability {capability} not ready after {waited:?}")]
    CapabilityTimeout {
        capability: Capability,
        waited: Duration,
    },

    #[error("Job interrupted before completion")]
    Interrupted,

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("Routing failed: {0}")]
    Routing(#[from] RoutingError),

    #[error("Job failed: {0}")]
    Failed(#[from] anyhow::Error),
}

impl JobError {
    /// Interruption is cancellation, not an ordinary failure.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            JobError::Interrupted | JobError::Routing(RoutingError::Interrupted)
        )
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GateError {
    #[error("Timed out after {waited:?} waiting for capability {capability}")]
    Timeout {
        capability: Capability,
        waited: Duration,
    },
}

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("No owner resolvable for shard '{0}'")]
    NoOwner(String),

    #[error("Owner {owner} of shard '{shard}' is not a current cluster member")]
    OwnerUnreachable { shard: String, owner: MemberAddress },

    #[error("Remote execution on {owner} timed out after {timeout:?}")]
    RemoteTimeout {
        owner: MemberAddress,
        timeout: Duration,
    },

    #[error("Remote execution on {owner} failed: {reason}")]
    Remote {
        owner: MemberAddress,
        reason: String,
    },

    #[error("Local execution failed: {0}")]
    Local(String),

    #[error("Partitioned call interrupted")]
    Interrupted,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to encode job: {0}")]
    Encode(String),

    #[error("Failed to decode message: {0}")]
    Decode(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Transport closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Dispatch loop already started")]
    AlreadyStarted,

    #[error("Dispatch loop was never started")]
    NotStarted,

    #[error("Dispatch loop faulted: {0}")]
    LoopFaulted(String),
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Publish failed: {0}")]
    Publish(#[from] TransportError),

    #[error("Ingress already {0}")]
    IngressState(&'static str),
}
