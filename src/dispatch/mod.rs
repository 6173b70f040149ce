//! Job Dispatch Module
//!
//! Pulls jobs out of the priority queue and executes them, either on a bounded worker pool
//! or inline on the dispatch loop when the job needs capabilities that are not ready yet.
//!
//! ## Architecture Overview
//! 1. **Take**: the loop blocks on the queue only when it is empty.
//! 2. **Batch**: once a job is available, up to `max_concurrent_jobs` are drained behind it.
//! 3. **Route**: `Delegate` jobs, and jobs whose capabilities are all ready, go to the pool
//!    (or run on the loop when the pool is full). Other jobs wait inline for their capabilities.
//! 4. **Execute**: `before_execute -> perform -> after_execute`, with partitioned jobs routed
//!    through the `ClusterRouter`.
//!
//! ## Submodules
//! - **`dispatcher`**: `DispatchLoop`, its lifecycle (start, stop, abort, join).
//! - **`execution`**: `JobExecutor`, the execution wrapper shared by both paths.
//! - **`pool`**: `WorkerPool`, a semaphore-bounded set of execution slots.
//! - **`types`**: state enum and counters.

pub mod dispatcher;
pub mod execution;
pub mod pool;
pub mod types;

pub use dispatcher::DispatchLoop;
pub use types::{DispatchState, DispatchStatsSnapshot};
