//! Gateway binary for provisioning and routing to sandboxed agent workloads.
//!
//! # Usage
//!
//! ```bash
//! sandgate serve --addr 0.0.0.0:10000 --namespace default
//! sandgate serve --environments /etc/sandgate/environments.json
//! ```
//!
//! The listen address, namespace and catalog path also come from the
//! `SANDGATE_ADDR`, `SANDGATE_NAMESPACE` and `SANDGATE_ENVIRONMENTS`
//! environment variables. `RUST_LOG` controls log filtering.

use std::sync::Arc;

use clap::{CommandFactory, Parser};
use sandgate::{
    activation::{ActivationRouter, ActivityTracker, EndpointResolver, ProxyClient, WaitQueue},
    backend::MemoryBackend,
    cli::{SandgateArgs, SandgateSubcommand},
    config::{EnvironmentCatalog, GatewayConfig, DEFAULT_NAMESPACE, DEFAULT_SERVER_ADDR},
    lifecycle::SandboxController,
    server::{create_router, ServerState},
    session::{SessionCache, ToolExecutor},
    store::WorkloadStore,
};
use tracing_subscriber::{fmt, EnvFilter};

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = SandgateArgs::parse();

    fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if args.verbose { "debug" } else { "info" })
        }))
        .init();

    match args.subcommand {
        Some(SandgateSubcommand::Serve {
            addr,
            namespace,
            environments,
        }) => {
            let config = GatewayConfig::builder()
                .server_addr(addr.unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()))
                .namespace(namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()))
                .environments_file(environments)
                .build();

            serve(config).await?;
        }
        None => {
            SandgateArgs::command().print_help()?;
        }
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: *
//--------------------------------------------------------------------------------------------------

/// Wires the gateway components together and serves until interrupted.
async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let store = WorkloadStore::new(backend, config.get_namespace().clone());

    let controller = Arc::new(SandboxController::new(
        store.clone(),
        *config.get_lifecycle(),
    ));
    let tracker = ActivityTracker::new(store.clone());
    let resolver = EndpointResolver::new(store, *config.get_resolver());
    let proxy = ProxyClient::new(*config.get_proxy());
    let queue = WaitQueue::new(*config.get_queue_depth());
    let router = Arc::new(ActivationRouter::new(
        resolver.clone(),
        tracker,
        proxy,
        queue,
    ));
    let executor = Arc::new(ToolExecutor::new(resolver, SessionCache::default()));

    let environments = Arc::new(match config.get_environments_file() {
        Some(path) => EnvironmentCatalog::load(path)?,
        None => EnvironmentCatalog::default_catalog(),
    });

    let state = ServerState::new(controller, router, executor, environments);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.get_server_addr()).await?;
    tracing::info!("sandgate listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves once ctrl-c arrives.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("shutting down");
}
