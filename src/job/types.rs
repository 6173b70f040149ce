use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of the built-in smoke-test job. Its handler is always registered.
pub const DIAGNOSTIC_JOB_KIND: &str = "diagnostic.noop";

/// Unique identifier for a job.
///
/// Wrapper around a UUID string so jobs can be traced across the transport and the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external dependency (e.g. the search backend) a job may need before it can run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(pub String);

impl Capability {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Capability {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a job is allowed to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobBehavior {
    /// Runs on the worker pool when its capabilities are ready, otherwise inline on the
    /// dispatch loop after waiting for them.
    #[default]
    ConsumerRuns,
    /// Always handed to the worker pool, whatever the capability state.
    Delegate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobOrigin {
    /// Submitted live.
    #[default]
    Active,
    /// Re-delivered by the transport after a restart.
    Recovered,
}

/// A unit of asynchronous work.
///
/// Priority and behavior are only changed through the job's own mutators; the queue
/// orders by them but never writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// Name of the registered handler that performs this job (e.g. "index_folder").
    pub kind: String,
    /// Arbitrary JSON passed to the handler.
    pub payload: serde_json::Value,
    priority: i32,
    /// Requests persistent delivery from the transport.
    pub durable: bool,
    pub required_capabilities: BTreeSet<Capability>,
    behavior: JobBehavior,
    /// Creation time (ms since epoch).
    pub timestamp_ms: u64,
    pub origin: JobOrigin,
    /// Set for resource-partitioned jobs; the perform step is routed to the shard owner.
    pub shard_key: Option<String>,
}

impl Job {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            kind: kind.into(),
            payload,
            priority: 0,
            durable: false,
            required_capabilities: BTreeSet::new(),
            behavior: JobBehavior::default(),
            timestamp_ms: now_ms(),
            origin: JobOrigin::Active,
            shard_key: None,
        }
    }

    /// The no-op smoke-test job submitted by the management surface.
    pub fn diagnostic() -> Self {
        Self::new(DIAGNOSTIC_JOB_KIND, serde_json::Value::Null).with_behavior(JobBehavior::Delegate)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_behavior(mut self, behavior: JobBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn requires(mut self, capability: impl Into<Capability>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn partitioned(mut self, shard_key: impl Into<String>) -> Self {
        self.shard_key = Some(shard_key.into());
        self
    }

    pub fn recovered(mut self) -> Self {
        self.origin = JobOrigin::Recovered;
        self
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn behavior(&self) -> JobBehavior {
        self.behavior
    }

    pub fn set_behavior(&mut self, behavior: JobBehavior) {
        self.behavior = behavior;
    }

    pub fn is_delegated(&self) -> bool {
        self.behavior == JobBehavior::Delegate
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
