use super::protocol::NodeStatus;
use crate::dispatch::DispatchLoop;
use crate::error::AdminError;
use crate::gate::ServiceReadinessGate;
use crate::job::types::{Job, JobId};
use crate::transport::{EgressAdapter, IngressAdapter};

use std::sync::Arc;

/// Operator-facing operations. None of them touches jobs already queued.
pub struct AdminService {
    node: String,
    egress: Arc<EgressAdapter>,
    ingress: Arc<IngressAdapter>,
    dispatcher: Arc<DispatchLoop>,
    gate: Arc<ServiceReadinessGate>,
}

impl AdminService {
    pub fn new(
        node: impl Into<String>,
        egress: Arc<EgressAdapter>,
        ingress: Arc<IngressAdapter>,
        dispatcher: Arc<DispatchLoop>,
        gate: Arc<ServiceReadinessGate>,
    ) -> Arc<Self> {
        Arc::new(Self {
            node: node.into(),
            egress,
            ingress,
            dispatcher,
            gate,
        })
    }

    /// Publishes the no-op smoke-test job through the transport.
    pub fn submit_diagnostic(&self) -> Result<JobId, AdminError> {
        let job = Job::diagnostic();
        self.egress.submit(&job, None)?;
        tracing::info!(job_id = %job.id, "Diagnostic job submitted");
        Ok(job.id)
    }

    /// Publishes `job`. Success means the transport accepted it, not that it ran.
    pub fn submit_job(&self, job: &Job, transport_priority: Option<i32>) -> Result<(), AdminError> {
        self.egress.submit(job, transport_priority)?;
        Ok(())
    }

    pub fn start_ingress(&self) -> Result<(), AdminError> {
        if self.ingress.start() {
            Ok(())
        } else {
            Err(AdminError::IngressState("started"))
        }
    }

    pub fn stop_ingress(&self) -> Result<(), AdminError> {
        if self.ingress.stop() {
            Ok(())
        } else {
            Err(AdminError::IngressState("stopped"))
        }
    }

    pub fn status(&self) -> NodeStatus {
        let queue = self.dispatcher.queue();
        NodeStatus {
            node: self.node.clone(),
            dispatch_state: self.dispatcher.state(),
            queue_len: queue.len(),
            queue_capacity: queue.capacity(),
            idle_workers: self.dispatcher.idle_workers(),
            ingress_accepting: self.ingress.is_accepting(),
            ingress: self.ingress.stats(),
            dispatch: self.dispatcher.stats(),
            ready_capabilities: self.gate.ready_capabilities(),
        }
    }
}
