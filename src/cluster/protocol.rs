//! Cluster Protocol Definitions
//!
//! DTOs for executing a partitioned call on its shard owner over HTTP.

use super::types::PartitionedCall;
use serde::{Deserialize, Serialize};

pub const ENDPOINT_PARTITIONED_EXECUTE: &str = "/internal/partitioned/execute";

#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionedExecuteRequest {
    pub shard_key: String,
    pub call: PartitionedCall,
}

/// `error` is set on failure; `result` may be absent for a `null` result.
#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionedExecuteResponse {
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}
