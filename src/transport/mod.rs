//! Transport Adapters Module
//!
//! The engine's two edges onto the external message transport.
//!
//! ## Inbound
//! The transport calls `MessageListener` callbacks; `IngressAdapter` decodes each binary
//! `JobEnvelope` and offers the job to the queue. Text and undecodable messages are logged
//! and discarded.
//!
//! ## Outbound
//! `EgressAdapter` encodes a job and publishes it in one transaction, with persistent
//! delivery for durable jobs and the job priority clamped to the transport's `0..=9` range.
//!
//! ## Submodules
//! - **`types`**: wire envelope, outbound message, delivery mode.
//! - **`ingress`** / **`egress`**: the two adapters and the transport-facing traits.
//! - **`loopback`**: in-process transport for single-node deployments.

pub mod egress;
pub mod ingress;
pub mod loopback;
pub mod types;

pub use egress::{EgressAdapter, PublishTransaction, Publisher};
pub use ingress::{IngressAdapter, IngressStats, MessageListener};
pub use loopback::LoopbackTransport;

#[cfg(test)]
mod tests;
