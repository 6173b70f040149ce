use super::provider::CapabilityListener;
use crate::error::GateError;
use crate::job::types::Capability;

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Current flag plus the number of false -> true transitions so far.
#[derive(Debug, Clone, Copy, Default)]
struct Readiness {
    ready: bool,
    generation: u64,
}

struct CapabilityState {
    ready: watch::Sender<Readiness>,
    waiters: AtomicUsize,
}

impl CapabilityState {
    fn new() -> Self {
        let (ready, _) = watch::channel(Readiness::default());
        Self {
            ready,
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Decrements the waiter count when an await finishes or is cancelled.
struct WaiterGuard<'a>(&'a AtomicUsize);

impl<'a> WaiterGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Composite capability lookup shared by the dispatch loop and the workers.
#[derive(Default)]
pub struct ServiceReadinessGate {
    capabilities: DashMap<Capability, Arc<CapabilityState>>,
}

impl ServiceReadinessGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self, capability: &Capability) -> Arc<CapabilityState> {
        if let Some(state) = self.capabilities.get(capability) {
            return state.value().clone();
        }
        self.capabilities
            .entry(capability.clone())
            .or_insert_with(|| Arc::new(CapabilityState::new()))
            .value()
            .clone()
    }

    pub fn is_ready(&self, capability: &Capability) -> bool {
        self.capabilities
            .get(capability)
            .map(|state| state.ready.borrow().ready)
            .unwrap_or(false)
    }

    pub fn serves_all<'a, I>(&self, capabilities: I) -> bool
    where
        I: IntoIterator<Item = &'a Capability>,
    {
        capabilities.into_iter().all(|c| self.is_ready(c))
    }

    /// The not-ready subset of `capabilities`, in iteration order.
    pub fn missing<'a, I>(&self, capabilities: I) -> Vec<Capability>
    where
        I: IntoIterator<Item = &'a Capability>,
    {
        capabilities
            .into_iter()
            .filter(|c| !self.is_ready(c))
            .cloned()
            .collect()
    }

    /// Waits until `capability` is ready. Returns at once if it already is.
    ///
    /// A waiter is released by any transition to ready that happens while it waits, even if
    /// the capability is lost again before the waiter gets to run.
    pub async fn await_ready(&self, capability: &Capability) {
        let state = self.state(capability);
        let mut ready = state.ready.subscribe();
        let seen = *ready.borrow_and_update();
        if seen.ready {
            return;
        }

        let _waiting = WaiterGuard::enter(&state.waiters);
        tracing::debug!(%capability, "Waiting for capability");
        // The sender lives in `state`, which we hold, so the channel cannot close here.
        let _ = ready
            .wait_for(|now| now.ready || now.generation != seen.generation)
            .await;
    }

    pub async fn await_ready_timeout(
        &self,
        capability: &Capability,
        timeout: Duration,
    ) -> Result<(), GateError> {
        tokio::time::timeout(timeout, self.await_ready(capability))
            .await
            .map_err(|_| GateError::Timeout {
                capability: capability.clone(),
                waited: timeout,
            })
    }

    /// Number of callers currently blocked in `await_ready` for `capability`.
    pub fn waiters(&self, capability: &Capability) -> usize {
        self.capabilities
            .get(capability)
            .map(|state| state.waiters.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn mark_ready(&self, capability: &Capability) {
        let changed = self
            .state(capability)
            .ready
            .send_if_modified(|now| {
                if now.ready {
                    return false;
                }
                now.ready = true;
                now.generation += 1;
                true
            });
        if changed {
            tracing::info!(%capability, "Capability ready");
        }
    }

    pub fn mark_lost(&self, capability: &Capability) {
        let changed = self
            .state(capability)
            .ready
            .send_if_modified(|now| std::mem::replace(&mut now.ready, false));
        if changed {
            tracing::warn!(%capability, "Capability lost");
        }
    }

    pub fn ready_capabilities(&self) -> Vec<Capability> {
        let mut ready: Vec<Capability> = self
            .capabilities
            .iter()
            .filter(|entry| entry.value().ready.borrow().ready)
            .map(|entry| entry.key().clone())
            .collect();
        ready.sort();
        ready
    }
}

impl CapabilityListener for ServiceReadinessGate {
    fn on_ready(&self, capability: &Capability) {
        self.mark_ready(capability);
    }

    fn on_lost(&self, capability: &Capability) {
        self.mark_lost(capability);
    }
}
