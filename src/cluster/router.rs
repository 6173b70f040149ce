use super::membership::MembershipProvider;
use super::ownership::OwnershipProvider;
use super::types::{MemberAddress, PartitionedCall};
use crate::error::RoutingError;
use crate::job::registry::{JobContext, JobHandlerRegistry};
use crate::job::types::Job;

use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes partitioned calls to the member that owns their shard.
pub struct ClusterRouter {
    membership: Arc<dyn MembershipProvider>,
    ownership: Arc<dyn OwnershipProvider>,
    registry: Arc<JobHandlerRegistry>,
    remote_timeout: Duration,
}

impl ClusterRouter {
    pub fn new(
        membership: Arc<dyn MembershipProvider>,
        ownership: Arc<dyn OwnershipProvider>,
        registry: Arc<JobHandlerRegistry>,
    ) -> Arc<Self> {
        Self::with_remote_timeout(membership, ownership, registry, DEFAULT_REMOTE_TIMEOUT)
    }

    /// Creates a router with an explicit bound on forwarded calls.
    ///
    /// # Arguments
    /// * `membership` - Current members, the local member and remote submission.
    /// * `ownership` - Shard owner lookup, acquisition and invalidation.
    /// * `registry` - Handlers used when the owner is the local member.
    /// * `remote_timeout` - Longest wait for a forwarded call before `RemoteTimeout`.
    pub fn with_remote_timeout(
        membership: Arc<dyn MembershipProvider>,
        ownership: Arc<dyn OwnershipProvider>,
        registry: Arc<JobHandlerRegistry>,
        remote_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            membership,
            ownership,
            registry,
            remote_timeout,
        })
    }

    /// Runs `call` on the owner of `shard_key`.
    ///
    /// No retries: a missing or unreachable owner is returned to the caller, who owns the
    /// retry policy. An unreachable owner's record is invalidated first, so a retry starts
    /// from a fresh acquisition.
    pub async fn run_partitioned(
        &self,
        shard_key: &str,
        call: PartitionedCall,
        ctx: &JobContext,
    ) -> Result<serde_json::Value, RoutingError> {
        self.route(shard_key, call, None, ctx).await
    }

    /// Same as [`run_partitioned`](Self::run_partitioned) for a queued job.
    ///
    /// When the owner is local the handler sees `job` itself, with its id, priority and
    /// origin, exactly as a direct invocation would.
    pub async fn run_partitioned_job(
        &self,
        shard_key: &str,
        job: &Job,
        ctx: &JobContext,
    ) -> Result<serde_json::Value, RoutingError> {
        let call = PartitionedCall::new(job.kind.clone(), job.payload.clone());
        self.route(shard_key, call, Some(job), ctx).await
    }

    async fn route(
        &self,
        shard_key: &str,
        call: PartitionedCall,
        job: Option<&Job>,
        ctx: &JobContext,
    ) -> Result<serde_json::Value, RoutingError> {
        let owner = self.resolve_owner(shard_key).await?;

        let member = self
            .membership
            .current_members()
            .into_iter()
            .find(|m| m.matches(&owner));

        let Some(member) = member else {
            tracing::warn!(
                "Owner {} of shard '{}' is no longer a cluster member, dropping record",
                owner,
                shard_key
            );
            self.ownership.invalidate(shard_key).await;
            return Err(RoutingError::OwnerUnreachable {
                shard: shard_key.to_string(),
                owner,
            });
        };

        if member.matches(&self.membership.local_member()) {
            tracing::debug!("Shard '{}' is local, running {} in-process", shard_key, call.kind);
            let result = match job {
                Some(job) => self.registry.invoke_job(job, ctx).await,
                None => self.registry.invoke(&call.kind, call.payload, ctx).await,
            };
            return result.map_err(|e| RoutingError::Local(e.to_string()));
        }

        tracing::debug!("Forwarding {} for shard '{}' to {}", call.kind, shard_key, member);
        self.run_remote(member, shard_key, &call, ctx).await
    }

    async fn resolve_owner(&self, shard_key: &str) -> Result<MemberAddress, RoutingError> {
        if let Some(owner) = self.ownership.lookup_owner(shard_key).await {
            return Ok(owner);
        }

        tracing::debug!("No owner recorded for shard '{}', acquiring", shard_key);
        if let Err(e) = self.ownership.acquire_shard(shard_key).await {
            tracing::warn!("Shard acquisition for '{}' failed: {}", shard_key, e);
        }

        match self.ownership.lookup_owner(shard_key).await {
            Some(owner) => Ok(owner),
            None => {
                tracing::error!("No owner resolvable for shard '{}'", shard_key);
                Err(RoutingError::NoOwner(shard_key.to_string()))
            }
        }
    }

    async fn run_remote(
        &self,
        member: MemberAddress,
        shard_key: &str,
        call: &PartitionedCall,
        ctx: &JobContext,
    ) -> Result<serde_json::Value, RoutingError> {
        let submission = self.membership.submit_remote(&member, shard_key, call);

        let outcome = tokio::select! {
            biased;
            _ = ctx.interrupted() => {
                tracing::info!("Abandoning remote execution on {}, engine interrupted", member);
                return Err(RoutingError::Interrupted);
            }
            outcome = tokio::time::timeout(self.remote_timeout, submission) => outcome,
        };

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(RoutingError::Remote {
                owner: member,
                reason: e.to_string(),
            }),
            Err(_) => {
                tracing::warn!(
                    "Remote execution on {} timed out after {:?}",
                    member,
                    self.remote_timeout
                );
                Err(RoutingError::RemoteTimeout {
                    owner: member,
                    timeout: self.remote_timeout,
                })
            }
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        self.remote_timeout
    }
}
