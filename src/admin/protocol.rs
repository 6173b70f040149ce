//! HTTP contract of the management surface.

use crate::dispatch::{DispatchState, DispatchStatsSnapshot};
use crate::job::types::{Capability, Job, JobBehavior, JobId};
use crate::transport::IngressStats;

use serde::{Deserialize, Serialize};

pub const ENDPOINT_DIAGNOSTIC: &str = "/admin/diagnostic";
pub const ENDPOINT_INGRESS_START: &str = "/admin/ingress/start";
pub const ENDPOINT_INGRESS_STOP: &str = "/admin/ingress/stop";
pub const ENDPOINT_STATUS: &str = "/admin/status";
pub const ENDPOINT_SUBMIT_JOB: &str = "/jobs/submit";

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub durable: bool,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub behavior: JobBehavior,
    #[serde(default)]
    pub shard_key: Option<String>,
    /// Overrides `priority` on the transport only.
    #[serde(default)]
    pub transport_priority: Option<i32>,
}

impl SubmitJobRequest {
    pub fn to_job(&self) -> Job {
        let mut job = Job::new(self.kind.clone(), self.payload.clone())
            .with_priority(self.priority)
            .with_behavior(self.behavior)
            .durable(self.durable);
        job.required_capabilities = self
            .required_capabilities
            .iter()
            .map(|c| Capability::new(c.as_str()))
            .collect();
        job.shard_key = self.shard_key.clone();
        job
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node: String,
    pub dispatch_state: DispatchState,
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub idle_workers: usize,
    pub ingress_accepting: bool,
    pub ingress: IngressStats,
    pub dispatch: DispatchStatsSnapshot,
    pub ready_capabilities: Vec<Capability>,
}
