//! Job Model Module
//!
//! Defines the unit of work that flows through the engine and the registry that maps a
//! job's `kind` to the code that performs it.
//!
//! ## Lifecycle
//! 1. **Creation**: Built by application code or decoded by the `IngressAdapter`.
//! 2. **Enqueue**: Offered once to the `BoundedPriorityQueue`.
//! 3. **Execution**: The `DispatchLoop` runs `before_execute -> perform -> after_execute`
//!    on the handler registered for the job's kind, inline or on the worker pool.
//! 4. **Discard**: Dropped after execution or after being evicted by a higher priority job.
//!
//! ## Submodules
//! - **`types`**: `Job`, its identifiers, and the behavior/origin enums.
//! - **`registry`**: `JobHandler` trait and the `JobHandlerRegistry` lookup table.

pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
