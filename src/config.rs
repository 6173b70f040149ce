use crate::cluster::ownership::{DEFAULT_NUM_PARTITIONS, DEFAULT_OWNERSHIP_TTL};
use crate::cluster::router::DEFAULT_REMOTE_TIMEOUT;
use crate::cluster::types::MemberAddress;
use crate::queue::DEFAULT_QUEUE_CAPACITY;

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 16;
pub const DEFAULT_CAPABILITY_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning of the local dispatch engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Queue size past which the lowest-priority job is evicted.
    pub queue_capacity: usize,
    /// Jobs drained from the queue per dispatch iteration.
    pub max_concurrent_jobs: usize,
    /// Permits in the worker pool.
    pub worker_threads: usize,
    /// Upper bound on an inline wait for one missing capability.
    pub capability_wait_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            capability_wait_timeout: DEFAULT_CAPABILITY_WAIT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_max_concurrent_jobs(mut self, batch: usize) -> Self {
        self.max_concurrent_jobs = batch.max(1);
        self
    }

    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers.max(1);
        self
    }

    pub fn with_capability_wait_timeout(mut self, timeout: Duration) -> Self {
        self.capability_wait_timeout = timeout;
        self
    }
}

/// Identity of this node in the cluster and how it talks to the others.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub bind_addr: SocketAddr,
    /// Other members, `host:port`. May include this node.
    pub peers: Vec<MemberAddress>,
    pub remote_timeout: Duration,
    pub ownership_ttl: Duration,
    pub num_partitions: u32,
    /// Per-request HTTP timeout for forwarded calls.
    pub request_timeout: Duration,
    /// Connection attempts per forwarded call.
    pub request_attempts: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 6000)),
            peers: Vec::new(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            ownership_ttl: DEFAULT_OWNERSHIP_TTL,
            num_partitions: DEFAULT_NUM_PARTITIONS,
            request_timeout: DEFAULT_REMOTE_TIMEOUT,
            request_attempts: 3,
        }
    }
}

impl ClusterConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_peer(mut self, peer: MemberAddress) -> Self {
        self.peers.push(peer);
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_ownership_ttl(mut self, ttl: Duration) -> Self {
        self.ownership_ttl = ttl;
        self
    }

    /// This node as a cluster member.
    pub fn local_member(&self) -> MemberAddress {
        MemberAddress::resolved(self.bind_addr)
    }
}
