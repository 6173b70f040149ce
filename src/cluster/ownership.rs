//! Shard ownership boundary and record.
//!
//! `OwnershipRecord` is the lazily-populated shard -> owner map. Entries expire after a TTL
//! so a stale owner is revalidated by a fresh acquisition instead of being trusted forever.
//! `PartitionedOwnership` hashes shard keys onto a fixed partition space and assigns each
//! partition to a member in sorted-membership order.

use super::membership::MembershipProvider;
use super::types::{MemberAddress, OwnerEntry};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_NUM_PARTITIONS: u32 = 256;
pub const DEFAULT_OWNERSHIP_TTL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait OwnershipProvider: Send + Sync {
    async fn lookup_owner(&self, shard_key: &str) -> Option<MemberAddress>;

    /// Claims the shard and publishes its owner. Best-effort and possibly slow.
    async fn acquire_shard(&self, shard_key: &str) -> Result<()>;

    /// Forgets the recorded owner so the next lookup misses and re-acquires.
    async fn invalidate(&self, shard_key: &str);
}

pub struct OwnershipRecord {
    entries: DashMap<String, OwnerEntry>,
    ttl: Duration,
}

impl OwnershipRecord {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Current owner, or `None` if absent or expired. Expired rows are dropped.
    pub fn get(&self, shard_key: &str) -> Option<MemberAddress> {
        let expired = match self.entries.get(shard_key) {
            Some(entry) if entry.recorded_at.elapsed() < self.ttl => {
                return Some(entry.owner.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(shard_key);
            tracing::debug!("Ownership record for '{}' expired", shard_key);
        }
        None
    }

    pub fn upsert(&self, shard_key: &str, owner: MemberAddress) {
        tracing::debug!("Shard '{}' now owned by {}", shard_key, owner);
        self.entries.insert(
            shard_key.to_string(),
            OwnerEntry {
                owner,
                recorded_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, shard_key: &str) {
        self.entries.remove(shard_key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OwnershipRecord {
    fn default() -> Self {
        Self::new(DEFAULT_OWNERSHIP_TTL)
    }
}

pub struct PartitionedOwnership {
    record: OwnershipRecord,
    membership: Arc<dyn MembershipProvider>,
    num_partitions: u32,
}

impl PartitionedOwnership {
    /// # Arguments
    /// * `membership` - Members that partitions are assigned to.
    /// * `num_partitions` - Size of the partition space. Clamped to at least 1.
    /// * `ttl` - How long an acquired owner is trusted before it is looked up again.
    pub fn new(
        membership: Arc<dyn MembershipProvider>,
        num_partitions: u32,
        ttl: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            record: OwnershipRecord::new(ttl),
            membership,
            num_partitions: num_partitions.max(1),
        })
    }

    pub fn get_partition(&self, shard_key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        shard_key.hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }

    /// Deterministic owner of `partition` among the current members.
    pub fn owner_of_partition(&self, partition: u32) -> Option<MemberAddress> {
        let mut members = self.membership.current_members();
        if members.is_empty() {
            return None;
        }
        members.sort_by_key(|m| m.to_string());
        let idx = (partition as usize) % members.len();
        Some(members.swap_remove(idx))
    }

    pub fn record(&self) -> &OwnershipRecord {
        &self.record
    }
}

#[async_trait]
impl OwnershipProvider for PartitionedOwnership {
    async fn lookup_owner(&self, shard_key: &str) -> Option<MemberAddress> {
        self.record.get(shard_key)
    }

    async fn acquire_shard(&self, shard_key: &str) -> Result<()> {
        let partition = self.get_partition(shard_key);
        let owner = self
            .owner_of_partition(partition)
            .ok_or_else(|| anyhow::anyhow!("No members available to own shard"))?;

        tracing::info!(
            "Acquired shard '{}' (partition {}) for {}",
            shard_key,
            partition,
            owner
        );
        self.record.upsert(shard_key, owner);
        Ok(())
    }

    async fn invalidate(&self, shard_key: &str) {
        self.record.invalidate(shard_key);
    }
}
