//! Capability provider boundary.
//!
//! The engine never discovers capabilities itself; a provider tells it when one appears or
//! goes away. `CapabilityRegistry` is the in-process provider used by the node and tests.

use crate::job::types::Capability;

use dashmap::DashSet;
use parking_lot::RwLock;
use std::sync::Arc;

/// Receives presence/absence signals for capabilities.
pub trait CapabilityListener: Send + Sync {
    fn on_ready(&self, capability: &Capability);
    fn on_lost(&self, capability: &Capability);
}

/// Source of capability signals.
pub trait CapabilityProvider: Send + Sync {
    /// Registers `listener`. Capabilities already present are replayed to it immediately.
    fn subscribe(&self, listener: Arc<dyn CapabilityListener>);
}

#[derive(Default)]
pub struct CapabilityRegistry {
    present: DashSet<Capability>,
    listeners: RwLock<Vec<Arc<dyn CapabilityListener>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Announces `capability` as available.
    pub fn register(&self, capability: impl Into<Capability>) {
        let capability = capability.into();
        if self.present.insert(capability.clone()) {
            for listener in self.listeners.read().iter() {
                listener.on_ready(&capability);
            }
        }
    }

    /// Withdraws `capability`.
    pub fn deregister(&self, capability: &Capability) {
        if self.present.remove(capability).is_some() {
            for listener in self.listeners.read().iter() {
                listener.on_lost(capability);
            }
        }
    }

    pub fn is_present(&self, capability: &Capability) -> bool {
        self.present.contains(capability)
    }
}

impl CapabilityProvider for CapabilityRegistry {
    fn subscribe(&self, listener: Arc<dyn CapabilityListener>) {
        // Registrations racing the replay wait on this lock and are then delivered too.
        let mut listeners = self.listeners.write();
        for capability in self.present.iter() {
            listener.on_ready(capability.key());
        }
        listeners.push(listener);
    }
}
