//! Node wiring.
//!
//! Builds every component of one cluster member and connects them: transport -> ingress ->
//! queue -> dispatch loop -> worker pool / cluster router, with the management surface and
//! the internal forwarding endpoint served over HTTP.

use crate::admin::AdminService;
use crate::admin::handlers::{
    handle_ingress_start, handle_ingress_stop, handle_status, handle_submit_diagnostic,
    handle_submit_job,
};
use crate::admin::protocol::{
    ENDPOINT_DIAGNOSTIC, ENDPOINT_INGRESS_START, ENDPOINT_INGRESS_STOP, ENDPOINT_STATUS,
    ENDPOINT_SUBMIT_JOB,
};
use crate::cluster::handlers::handle_partitioned_execute;
use crate::cluster::membership::{MembershipProvider, StaticMembership};
use crate::cluster::ownership::PartitionedOwnership;
use crate::cluster::protocol::ENDPOINT_PARTITIONED_EXECUTE;
use crate::cluster::router::ClusterRouter;
use crate::config::{ClusterConfig, EngineConfig};
use crate::dispatch::DispatchLoop;
use crate::gate::{CapabilityProvider, CapabilityRegistry, ServiceReadinessGate};
use crate::job::registry::JobHandlerRegistry;
use crate::queue::BoundedPriorityQueue;
use crate::transport::{EgressAdapter, IngressAdapter, LoopbackTransport};

use anyhow::Result;
use axum::{
    Extension, Router,
    routing::{get, post},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Node {
    cluster: ClusterConfig,
    queue: Arc<BoundedPriorityQueue>,
    gate: Arc<ServiceReadinessGate>,
    capabilities: Arc<CapabilityRegistry>,
    registry: Arc<JobHandlerRegistry>,
    membership: Arc<StaticMembership>,
    ownership: Arc<PartitionedOwnership>,
    dispatcher: Arc<DispatchLoop>,
    transport: Arc<LoopbackTransport>,
    ingress: Arc<IngressAdapter>,
    egress: Arc<EgressAdapter>,
    admin: Arc<AdminService>,
    delivery: Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    pub fn new(engine: EngineConfig, cluster: ClusterConfig) -> Arc<Self> {
        let local = cluster.local_member();

        let queue = Arc::new(BoundedPriorityQueue::new(engine.queue_capacity));
        let gate = ServiceReadinessGate::new();
        let capabilities = CapabilityRegistry::new();
        capabilities.subscribe(gate.clone());
        let registry = JobHandlerRegistry::new();

        let membership = StaticMembership::with_request_policy(
            local.clone(),
            cluster.peers.clone(),
            cluster.request_timeout,
            cluster.request_attempts,
        );
        let ownership = PartitionedOwnership::new(
            membership.clone(),
            cluster.num_partitions,
            cluster.ownership_ttl,
        );
        let router = ClusterRouter::with_remote_timeout(
            membership.clone(),
            ownership.clone(),
            registry.clone(),
            cluster.remote_timeout,
        );

        let dispatcher = DispatchLoop::new(
            queue.clone(),
            gate.clone(),
            registry.clone(),
            Some(router),
            &engine,
        );

        let transport = LoopbackTransport::new();
        let ingress = IngressAdapter::new(queue.clone());
        let egress = EgressAdapter::new(transport.clone());
        let admin = AdminService::new(
            local.to_string(),
            egress.clone(),
            ingress.clone(),
            dispatcher.clone(),
            gate.clone(),
        );

        Arc::new(Self {
            cluster,
            queue,
            gate,
            capabilities,
            registry,
            membership,
            ownership,
            dispatcher,
            transport,
            ingress,
            egress,
            admin,
            delivery: Mutex::new(None),
        })
    }

    /// Connects the transport and starts the dispatch loop.
    pub fn start(&self) -> Result<()> {
        let delivery = self.transport.attach(self.ingress.clone())?;
        *self.delivery.lock() = Some(delivery);
        self.dispatcher.start()?;
        tracing::info!(
            "Node {} started ({} cluster members)",
            self.cluster.local_member(),
            self.membership.current_members().len()
        );
        Ok(())
    }

    /// HTTP routes: management surface plus the internal forwarding endpoint.
    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT_DIAGNOSTIC, post(handle_submit_diagnostic))
            .route(ENDPOINT_INGRESS_START, post(handle_ingress_start))
            .route(ENDPOINT_INGRESS_STOP, post(handle_ingress_stop))
            .route(ENDPOINT_STATUS, get(handle_status))
            .route(ENDPOINT_SUBMIT_JOB, post(handle_submit_job))
            .route(ENDPOINT_PARTITIONED_EXECUTE, post(handle_partitioned_execute))
            .layer(Extension(self.admin.clone()))
            .layer(Extension(self.registry.clone()))
    }

    /// Serves HTTP on the bind address until `shutdown` is cancelled.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.cluster.bind_addr).await?;
        tracing::info!("HTTP server listening on {}", self.cluster.bind_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }

    /// Graceful stop: deliver what the transport already committed, then drain the queue.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down node");
        self.transport.shutdown();

        let delivery = self.delivery.lock().take();
        if let Some(delivery) = delivery {
            delivery.await?;
        }

        self.dispatcher.stop();
        self.dispatcher.join().await?;
        tracing::info!("Node stopped, {} jobs left in queue", self.queue.len());
        Ok(())
    }

    pub fn registry(&self) -> &Arc<JobHandlerRegistry> {
        &self.registry
    }

    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    pub fn gate(&self) -> &Arc<ServiceReadinessGate> {
        &self.gate
    }

    pub fn membership(&self) -> &Arc<StaticMembership> {
        &self.membership
    }

    pub fn ownership(&self) -> &Arc<PartitionedOwnership> {
        &self.ownership
    }

    pub fn dispatcher(&self) -> &Arc<DispatchLoop> {
        &self.dispatcher
    }

    pub fn egress(&self) -> &Arc<EgressAdapter> {
        &self.egress
    }

    pub fn admin(&self) -> &Arc<AdminService> {
        &self.admin
    }
}
