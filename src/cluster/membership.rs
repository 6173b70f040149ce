//! Cluster membership boundary.
//!
//! The engine only needs three things from membership: who is in the cluster, who we are,
//! and a way to run a call on someone else. `StaticMembership` answers them from the
//! configured peer list and speaks HTTP to the other members.

use super::protocol::{
    ENDPOINT_PARTITIONED_EXECUTE, PartitionedExecuteRequest, PartitionedExecuteResponse,
};
use super::types::{MemberAddress, PartitionedCall};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait MembershipProvider: Send + Sync {
    fn current_members(&self) -> Vec<MemberAddress>;

    fn local_member(&self) -> MemberAddress;

    /// Runs `call` on `member` and returns its result.
    async fn submit_remote(
        &self,
        member: &MemberAddress,
        shard_key: &str,
        call: &PartitionedCall,
    ) -> Result<serde_json::Value>;
}

/// Membership fixed by configuration; members can still be added or removed at runtime.
pub struct StaticMembership {
    local: MemberAddress,
    members: RwLock<Vec<MemberAddress>>,
    http_client: reqwest::Client,
    request_timeout: Duration,
    attempts: usize,
}

impl StaticMembership {
    /// `peers` may or may not include `local`; it is always added.
    pub fn new(local: MemberAddress, peers: Vec<MemberAddress>) -> Arc<Self> {
        Self::with_request_policy(local, peers, Duration::from_secs(30), 3)
    }

    pub fn with_request_policy(
        local: MemberAddress,
        peers: Vec<MemberAddress>,
        request_timeout: Duration,
        attempts: usize,
    ) -> Arc<Self> {
        let mut members = vec![local.clone()];
        for peer in peers {
            if !members.iter().any(|m| m.matches(&peer)) {
                members.push(peer);
            }
        }

        Arc::new(Self {
            local,
            members: RwLock::new(members),
            http_client: reqwest::Client::new(),
            request_timeout,
            attempts: attempts.max(1),
        })
    }

    pub fn add_member(&self, member: MemberAddress) {
        let mut members = self.members.write();
        if !members.iter().any(|m| m.matches(&member)) {
            tracing::info!("Member joined: {}", member);
            members.push(member);
        }
    }

    pub fn remove_member(&self, member: &MemberAddress) {
        let mut members = self.members.write();
        let before = members.len();
        members.retain(|m| !m.matches(member));
        if members.len() < before {
            tracing::info!("Member left: {}", member);
        }
    }

    async fn post_with_retry<T: serde::Serialize>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(self.request_timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                // Only connection-level failures are retried; a request that reached the
                // owner may have run there.
                Err(e) if e.is_connect() && attempt + 1 < self.attempts => {
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
                Err(e) => return Err(anyhow::anyhow!(e)),
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

#[async_trait]
impl MembershipProvider for StaticMembership {
    fn current_members(&self) -> Vec<MemberAddress> {
        self.members.read().clone()
    }

    fn local_member(&self) -> MemberAddress {
        self.local.clone()
    }

    async fn submit_remote(
        &self,
        member: &MemberAddress,
        shard_key: &str,
        call: &PartitionedCall,
    ) -> Result<serde_json::Value> {
        let payload = PartitionedExecuteRequest {
            shard_key: shard_key.to_string(),
            call: call.clone(),
        };

        let response = self
            .post_with_retry(
                format!("{}{}", member.http_base(), ENDPOINT_PARTITIONED_EXECUTE),
                &payload,
            )
            .await?;

        let status = response.status();
        let body: PartitionedExecuteResponse = response.json().await?;

        match (status.is_success(), body.error) {
            (_, Some(error)) => Err(anyhow::anyhow!(error)),
            // A `null` result deserializes as `None`.
            (true, None) => Ok(body.result.unwrap_or_default()),
            (false, None) => Err(anyhow::anyhow!("Remote execution failed: {}", status)),
        }
    }
}
