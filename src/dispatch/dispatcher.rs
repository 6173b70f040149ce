//! Dispatch Loop Implementation
//!
//! Single consumer of the `BoundedPriorityQueue`. Each iteration blocks for one job, drains
//! up to a batch behind it, and routes every job of the batch.
//!
//! ## Responsibilities
//! - **Routing**: delegated jobs and jobs whose capabilities are all ready go to the
//!   `WorkerPool`; the rest run inline after waiting for their capabilities.
//! - **Caller-runs**: a pool-bound job that finds no free worker runs on the loop itself,
//!   unless it still has capabilities to wait for; then it is parked until a worker frees up.
//! - **Shutdown**: `stop` closes the queue and the loop drains what is left before exiting;
//!   `abort` interrupts waiting jobs and exits after the current batch.
//! - **Self-healing**: a panic escaping an iteration is logged and the loop carries on.

use super::execution::{JobExecutor, panic_message};
use super::pool::WorkerPool;
use super::types::{DispatchState, DispatchStats, DispatchStatsSnapshot, Flow};
use crate::cluster::router::ClusterRouter;
use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::gate::ServiceReadinessGate;
use crate::job::registry::JobHandlerRegistry;
use crate::job::types::Job;
use crate::queue::BoundedPriorityQueue;

use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The engine that drives job execution.
pub struct DispatchLoop {
    queue: Arc<BoundedPriorityQueue>,
    gate: Arc<ServiceReadinessGate>,
    executor: Arc<JobExecutor>,
    pool: WorkerPool,
    batch_size: usize,
    /// Cancelled by `stop`: drain, then exit.
    shutdown: CancellationToken,
    /// Cancelled by `abort`: interrupt waits, exit after the current batch.
    interrupt: CancellationToken,
    state: Mutex<DispatchState>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
}

impl DispatchLoop {
    /// Creates a loop over `queue`. The loop is idle until `start` is called.
    ///
    /// # Arguments
    /// * `queue` - The queue this loop is the single consumer of.
    /// * `gate` - Capability readiness used for routing and inline waits.
    /// * `registry` - Handlers resolved by job kind.
    /// * `router` - Optional. Without one, partitioned jobs are performed in-process.
    /// * `config` - Batch size, worker count and capability wait bound.
    pub fn new(
        queue: Arc<BoundedPriorityQueue>,
        gate: Arc<ServiceReadinessGate>,
        registry: Arc<JobHandlerRegistry>,
        router: Option<Arc<ClusterRouter>>,
        config: &EngineConfig,
    ) -> Arc<Self> {
        let interrupt = CancellationToken::new();
        let stats = Arc::new(DispatchStats::default());
        let executor = JobExecutor::new(
            registry,
            gate.clone(),
            router,
            config.capability_wait_timeout,
            interrupt.clone(),
            stats.clone(),
        );

        Arc::new(Self {
            queue,
            gate,
            executor,
            pool: WorkerPool::new(config.worker_threads),
            batch_size: config.max_concurrent_jobs.max(1),
            shutdown: CancellationToken::new(),
            interrupt,
            state: Mutex::new(DispatchState::Idle),
            handle: Mutex::new(None),
            stats,
        })
    }

    /// Spawns the loop and returns immediately. A loop can be started once.
    pub fn start(self: &Arc<Self>) -> Result<(), DispatchError> {
        {
            let mut state = self.state.lock();
            if *state != DispatchState::Idle {
                return Err(DispatchError::AlreadyStarted);
            }
            *state = DispatchState::Running;
        }

        tracing::info!(
            "Starting dispatch loop (batch size {}, {} workers)",
            self.batch_size,
            self.pool.size()
        );

        let dispatcher = self.clone();
        *self.handle.lock() = Some(tokio::spawn(async move {
            dispatcher.run().await;
        }));
        Ok(())
    }

    /// Stops accepting jobs. Everything already queued is still executed, exactly once.
    pub fn stop(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!("Stopping dispatch loop, {} jobs left to drain", self.queue.len());
        self.queue.close();
        self.shutdown.cancel();
    }

    /// Stops without draining. Jobs waiting on capabilities fail with `Interrupted`.
    pub fn abort(&self) {
        tracing::warn!("Aborting dispatch loop");
        self.interrupt.cancel();
        self.stop();
    }

    /// Waits for the loop to exit.
    ///
    /// The loop is not restarted after a fault; the fault is returned here instead.
    pub async fn join(&self) -> Result<(), DispatchError> {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return Err(DispatchError::NotStarted);
        };

        match handle.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_panic() => {
                let reason = panic_message(&*e.into_panic());
                tracing::error!("Dispatch loop faulted: {}", reason);
                *self.state.lock() = DispatchState::Stopped;
                Err(DispatchError::LoopFaulted(reason))
            }
            Err(e) => Err(DispatchError::LoopFaulted(e.to_string())),
        }
    }

    pub fn state(&self) -> DispatchState {
        *self.state.lock()
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn queue(&self) -> &Arc<BoundedPriorityQueue> {
        &self.queue
    }

    /// Workers currently idle.
    pub fn idle_workers(&self) -> usize {
        self.pool.available()
    }

    async fn run(self: Arc<Self>) {
        loop {
            match AssertUnwindSafe(self.iteration()).catch_unwind().await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(panic) => {
                    tracing::error!(
                        "Dispatch iteration panicked, continuing: {}",
                        panic_message(&*panic)
                    );
                }
            }
        }

        if self.interrupt.is_cancelled() {
            let dropped = self.queue.drain_up_to(usize::MAX).len();
            if dropped > 0 {
                tracing::warn!("Abort discarded {} queued jobs", dropped);
                self.stats.record_dropped(dropped as u64);
            }
        }

        self.pool.wait_idle().await;
        *self.state.lock() = DispatchState::Stopped;
        tracing::info!("Dispatch loop stopped");
    }

    /// One block-drain-route cycle.
    async fn iteration(&self) -> Flow {
        let first = tokio::select! {
            biased;
            _ = self.interrupt.cancelled() => return Flow::Exit,
            entry = self.queue.take() => entry,
        };

        // `take` only yields `None` once `stop` has closed the queue and it is empty.
        let Some(first) = first else {
            return Flow::Exit;
        };

        if self.shutdown.is_cancelled() {
            let mut state = self.state.lock();
            if *state == DispatchState::Running {
                tracing::info!("Dispatch loop draining");
                *state = DispatchState::Draining;
            }
        }

        let mut batch = vec![first];
        batch.extend(self.queue.drain_up_to(self.batch_size - 1));
        tracing::trace!("Dispatching batch of {} jobs", batch.len());

        for entry in batch {
            self.dispatch(entry.job).await;
        }

        if self.interrupt.is_cancelled() {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }

    async fn dispatch(&self, job: Job) {
        if job.is_delegated() || self.gate.serves_all(&job.required_capabilities) {
            self.stats.record_delegated();
            tracing::debug!(job_id = %job.id, kind = %job.kind, "Handing job to worker pool");

            let job_id = job.id.clone();
            let missing = self.gate.missing(&job.required_capabilities);
            let executor = self.executor.clone();
            let work = async move {
                let _ = executor.execute(&job).await;
            };

            let Err(work) = self.pool.try_spawn(work) else {
                return;
            };

            if missing.is_empty() {
                self.stats.record_caller_runs();
                tracing::debug!(job_id = %job_id, "Worker pool saturated, running job on the dispatch loop");
                work.await;
            } else {
                // A capability wait must never stall the loop.
                tracing::debug!(
                    job_id = %job_id,
                    missing = missing.len(),
                    "Worker pool saturated, parking job until a worker frees up"
                );
                self.pool.spawn_when_free(work);
            }
        } else {
            self.stats.record_inline();
            tracing::debug!(job_id = %job.id, kind = %job.kind, "Running job inline");
            let _ = self.executor.execute(&job).await;
        }
    }
}
