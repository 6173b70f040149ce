//! Execution wrapper shared by the inline path and the worker pool.

use super::types::DispatchStats;
use crate::cluster::router::ClusterRouter;
use crate::error::{GateError, JobError};
use crate::gate::ServiceReadinessGate;
use crate::job::registry::{JobContext, JobHandler, JobHandlerRegistry};
use crate::job::types::Job;

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs one job through its lifecycle hooks.
pub struct JobExecutor {
    registry: Arc<JobHandlerRegistry>,
    gate: Arc<ServiceReadinessGate>,
    router: Option<Arc<ClusterRouter>>,
    capability_wait_timeout: Duration,
    interrupt: CancellationToken,
    stats: Arc<DispatchStats>,
}

impl JobExecutor {
    pub fn new(
        registry: Arc<JobHandlerRegistry>,
        gate: Arc<ServiceReadinessGate>,
        router: Option<Arc<ClusterRouter>>,
        capability_wait_timeout: Duration,
        interrupt: CancellationToken,
        stats: Arc<DispatchStats>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            gate,
            router,
            capability_wait_timeout,
            interrupt,
            stats,
        })
    }

    /// `before_execute` -> capability wait -> `perform` -> `after_execute`.
    ///
    /// `after_execute` runs exactly once, whatever the outcome, including a panic inside the
    /// handler. A panic inside `after_execute` itself is logged and does not change the
    /// outcome. A job of unknown kind fails without any hook being called.
    pub async fn execute(&self, job: &Job) -> Result<serde_json::Value, JobError> {
        let Some(handler) = self.registry.get(&job.kind) else {
            tracing::warn!(job_id = %job.id, kind = %job.kind, "No handler registered, discarding job");
            self.stats.record_failed();
            return Err(JobError::UnknownHandler(job.kind.clone()));
        };

        let outcome = AssertUnwindSafe(self.attempt(handler.as_ref(), job))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Panicked(panic_message(&*panic))));

        if let Err(panic) = AssertUnwindSafe(handler.after_execute(job, outcome.as_ref().err()))
            .catch_unwind()
            .await
        {
            tracing::error!(
                job_id = %job.id,
                kind = %job.kind,
                "after_execute panicked: {}",
                panic_message(&*panic)
            );
        }

        match &outcome {
            Ok(_) => {
                tracing::debug!(job_id = %job.id, kind = %job.kind, "Job completed");
                self.stats.record_executed();
            }
            Err(e) if e.is_interruption() => {
                tracing::info!(job_id = %job.id, kind = %job.kind, "Job interrupted");
                self.stats.record_failed();
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, kind = %job.kind, "Job failed: {}", e);
                self.stats.record_failed();
            }
        }
        outcome
    }

    async fn attempt(
        &self,
        handler: &dyn JobHandler,
        job: &Job,
    ) -> Result<serde_json::Value, JobError> {
        handler.before_execute(job).await;
        self.await_capabilities(job).await?;

        let ctx = JobContext::new(self.interrupt.clone());
        match (&job.shard_key, &self.router) {
            (Some(shard_key), Some(router)) => {
                Ok(router.run_partitioned_job(shard_key, job, &ctx).await?)
            }
            _ => Ok(handler.perform(job, &ctx).await?),
        }
    }

    /// Waits for each missing capability in turn, bounded and interruptible.
    async fn await_capabilities(&self, job: &Job) -> Result<(), JobError> {
        for capability in self.gate.missing(&job.required_capabilities) {
            tracing::debug!(job_id = %job.id, %capability, "Job waiting for capability");
            tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => return Err(JobError::Interrupted),
                ready = self.gate.await_ready_timeout(&capability, self.capability_wait_timeout) => {
                    ready.map_err(|GateError::Timeout { capability, waited }| {
                        JobError::CapabilityTimeout { capability, waited }
                    })?;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
