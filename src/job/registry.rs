//! Job Handler Registry
//!
//! Maps job kinds (e.g. "index_folder") to the code that runs them. Keeps the dispatch
//! core generic: it only knows the lifecycle hooks, never the business logic.

use super::types::{DIAGNOSTIC_JOB_KIND, Job};
use crate::error::JobError;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-execution context handed to `perform`.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    interrupt: CancellationToken,
}

impl JobContext {
    pub fn new(interrupt: CancellationToken) -> Self {
        Self { interrupt }
    }

    /// True once the engine has been aborted. Long-running jobs should poll this.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Resolves when the engine is aborted.
    pub async fn interrupted(&self) {
        self.interrupt.cancelled().await
    }
}

/// Lifecycle hooks of a job kind.
///
/// `before_execute` and `after_execute` run on the node that dequeued the job;
/// `perform` may run on a remote shard owner for partitioned jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn before_execute(&self, _job: &Job) {}

    async fn perform(&self, job: &Job, ctx: &JobContext) -> Result<serde_json::Value>;

    /// Called exactly once per execution attempt, with the failure if there was one.
    async fn after_execute(&self, _job: &Job, _error: Option<&JobError>) {}
}

/// Type alias for a thread-safe, asynchronous perform-only handler function.
pub type JobHandlerFn = Arc<
    dyn Fn(Job) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>> + Send + Sync,
>;

struct FnHandler(JobHandlerFn);

#[async_trait]
impl JobHandler for FnHandler {
    async fn perform(&self, job: &Job, _ctx: &JobContext) -> Result<serde_json::Value> {
        (self.0)(job.clone()).await
    }
}

struct DiagnosticHandler;

#[async_trait]
impl JobHandler for DiagnosticHandler {
    async fn perform(&self, job: &Job, _ctx: &JobContext) -> Result<serde_json::Value> {
        tracing::info!(job_id = %job.id, "Diagnostic job executed");
        Ok(serde_json::Value::Null)
    }
}

/// Registry holding the mapping between job kinds and their implementation.
pub struct JobHandlerRegistry {
    handlers: DashMap<String, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    /// Creates a registry with only the diagnostic handler installed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a perform-only closure under `kind`.
    pub fn register<F, Fut>(&self, kind: &str, handler: F)
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let handler_fn: JobHandlerFn = Arc::new(move |job: Job| {
            Box::pin(handler(job)) as Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
        });

        self.register_handler(kind, Arc::new(FnHandler(handler_fn)));
    }

    /// Registers a handler with its own lifecycle hooks.
    pub fn register_handler(&self, kind: &str, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(kind.to_string(), handler);
        tracing::info!("Registered job handler: {}", kind);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(kind).map(|entry| entry.value().clone())
    }

    /// Runs only the perform step of `kind` against `payload`.
    ///
    /// Used for partitioned calls executed on the shard owner, where the hooks have
    /// already run (or will run) on the dispatching node.
    pub async fn invoke(
        &self,
        kind: &str,
        payload: serde_json::Value,
        ctx: &JobContext,
    ) -> std::result::Result<serde_json::Value, JobError> {
        self.invoke_job(&Job::new(kind, payload), ctx).await
    }

    /// Runs only the perform step of the handler registered for `job.kind`.
    pub async fn invoke_job(
        &self,
        job: &Job,
        ctx: &JobContext,
    ) -> std::result::Result<serde_json::Value, JobError> {
        let handler = self
            .get(&job.kind)
            .ok_or_else(|| JobError::UnknownHandler(job.kind.clone()))?;

        tracing::debug!(
            job_id = %job.id,
            "Invoking handler '{}' (payload size: {} bytes)",
            job.kind,
            job.payload.to_string().len()
        );

        handler.perform(job, ctx).await.map_err(JobError::Failed)
    }

    pub fn list_handlers(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for JobHandlerRegistry {
    fn default() -> Self {
        let handlers: DashMap<String, Arc<dyn JobHandler>> = DashMap::new();
        handlers.insert(DIAGNOSTIC_JOB_KIND.to_string(), Arc::new(DiagnosticHandler));
        Self { handlers }
    }
}
