//! Distributed Job Dispatch Library
//!
//! This library crate defines the engine that buffers, gates and routes indexing jobs on a
//! cluster node. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`job`**: The unit of work and the registry of handlers that perform each job kind.
//! - **`queue`**: A bounded priority queue that evicts the lowest-priority job on overflow.
//! - **`gate`**: Readiness flags for external capabilities, with broadcast waiting.
//! - **`dispatch`**: The single-consumer dispatch loop, its worker pool and execution wrapper.
//! - **`cluster`**: Shard ownership, membership, and routing of partitioned work to the owner.
//! - **`transport`**: Ingress/egress adapters onto the external message transport.
//! - **`admin`**: Management operations (diagnostic job, ingress on/off, status) over HTTP.
//! - **`config`** / **`error`** / **`node`**: configuration, error taxonomy, and wiring.

pub mod admin;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod job;
pub mod node;
pub mod queue;
pub mod transport;
