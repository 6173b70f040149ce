use clap::Parser;
use cluster_dispatch::cluster::types::MemberAddress;
use cluster_dispatch::config::{ClusterConfig, EngineConfig};
use cluster_dispatch::node::Node;
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cluster-dispatch")]
#[command(version)]
#[command(about = "Priority-aware job dispatch node for a distributed indexing cluster")]
struct Args {
    /// HTTP address of this node; also its identity in the cluster
    #[arg(long, default_value = "127.0.0.1:6000", env = "DISPATCH_BIND")]
    bind: SocketAddr,

    /// Other cluster members as host:port (repeatable)
    #[arg(long = "peer", value_parser = parse_member)]
    peers: Vec<MemberAddress>,

    /// Queue size past which the lowest-priority job is evicted
    #[arg(long, default_value_t = cluster_dispatch::queue::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Jobs drained per dispatch iteration
    #[arg(long, default_value_t = cluster_dispatch::config::DEFAULT_MAX_CONCURRENT_JOBS)]
    batch_size: usize,

    /// Worker pool size (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Bound on a forwarded partitioned call, in seconds
    #[arg(long, default_value = "30")]
    remote_timeout_secs: u64,

    /// Bound on an inline wait for one capability, in seconds
    #[arg(long, default_value = "30")]
    capability_wait_secs: u64,

    /// Capabilities available from startup (repeatable)
    #[arg(long = "capability")]
    capabilities: Vec<String>,
}

fn parse_member(raw: &str) -> Result<MemberAddress, String> {
    MemberAddress::parse(raw).ok_or_else(|| format!("expected host:port, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut engine = EngineConfig::default()
        .with_queue_capacity(args.queue_capacity)
        .with_max_concurrent_jobs(args.batch_size)
        .with_capability_wait_timeout(Duration::from_secs(args.capability_wait_secs));
    if let Some(workers) = args.workers {
        engine = engine.with_worker_threads(workers);
    }

    let mut cluster = ClusterConfig::new(args.bind)
        .with_remote_timeout(Duration::from_secs(args.remote_timeout_secs));
    for peer in args.peers {
        cluster = cluster.with_peer(peer);
    }

    tracing::info!(
        bind = %cluster.bind_addr,
        peers = ?cluster.peers.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
        workers = engine.worker_threads,
        batch_size = engine.max_concurrent_jobs,
        "Starting dispatch node"
    );

    let node = Node::new(engine, cluster);

    node.registry().register("echo", |job| async move {
        tracing::info!(job_id = %job.id, "Echo job: {}", job.payload);
        Ok(job.payload)
    });

    for capability in args.capabilities {
        node.capabilities().register(capability.as_str());
    }

    node.start()?;

    let shutdown = install_shutdown_handler();
    node.serve(shutdown).await?;

    node.shutdown().await?;
    Ok(())
}

/// Cancels the returned token on Ctrl-C, or SIGTERM on unix.
fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = sigterm.recv() => tracing::info!("Received SIGTERM, draining"),
                        _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, draining"),
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Received Ctrl-C, draining");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received Ctrl-C, draining");
        }

        token_clone.cancel();
    });

    token
}
