//! Service Readiness Gate Module
//!
//! Tracks which external capabilities (search backend, extractors, ...) are currently
//! available and lets callers wait for one to appear.
//!
//! ## Core Mechanisms
//! - **Readiness flags**: one per capability, flipped only by the capability provider callbacks.
//! - **Broadcast wake-up**: every transition to ready wakes all current awaiters once; awaiters
//!   re-check the flag after waking, so a flap back to lost before they run is handled.
//! - **Routing snapshot**: `serves_all` is a non-blocking check used by the dispatch loop.

pub mod provider;
pub mod readiness;

pub use provider::{CapabilityListener, CapabilityProvider, CapabilityRegistry};
pub use readiness::ServiceReadinessGate;
