//! Cluster Routing Module
//!
//! Executes resource-partitioned work on the cluster member that owns the shard.
//!
//! ## Routing Flow
//! 1. **Lookup**: read the ownership record for the shard key.
//! 2. **Acquire**: on a miss, ask the ownership provider to claim the shard, then re-read once.
//! 3. **Resolve**: match the recorded owner against the current membership list
//!    (IP comparison for resolved addresses, hostname comparison otherwise).
//! 4. **Execute**: run in-process when the owner is this node, otherwise POST the call to the
//!    owner and wait, bounded by the remote timeout.
//!
//! ## Submodules
//! - **`types`**: member addresses and the serializable partitioned call.
//! - **`membership`**: `MembershipProvider` boundary and the static, HTTP-backed implementation.
//! - **`ownership`**: `OwnershipProvider` boundary, the TTL ownership record, hash partitioning.
//! - **`router`**: `ClusterRouter`.
//! - **`protocol`** / **`handlers`**: the internal HTTP contract for remote execution.

pub mod handlers;
pub mod membership;
pub mod ownership;
pub mod protocol;
pub mod router;
pub mod types;
