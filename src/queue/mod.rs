//! Bounded Priority Queue Module
//!
//! In-memory buffer between the transport and the dispatch loop.
//!
//! ## Ordering
//! Entries are ordered by `(priority desc, sequence asc)`: higher priority first, arrival
//! order within a priority class.
//!
//! ## Backpressure
//! The queue never blocks a producer and never rejects for being full. When an insert pushes
//! it past capacity, the single worst entry under the full ordering is evicted. That may be
//! an old low-priority job, or the job that was just offered. Freshness over completeness.

pub mod bounded;

pub use bounded::{BoundedPriorityQueue, DEFAULT_QUEUE_CAPACITY, QueueEntry};
