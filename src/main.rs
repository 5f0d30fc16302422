//! Load-Test RPC Server (v1)
//!
//! A lifecycle shell around a framed RPC service, built with Tokio.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                RPC LOAD SERVER                │
//!                     │                                               │
//!    Client frames    │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!    ─────────────────┼─▶│   net   │───▶│   rpc   │───▶│ handler  │  │
//!                     │  │acceptor │    │ worker  │    │ registry │  │
//!                     │  └─────────┘    └────┬────┘    └──────────┘  │
//!                     │                      │                       │
//!    Response frames  │                      ▼                       │
//!    ◀────────────────┼───────────────  wire codec                   │
//!                     │                                               │
//!                     │  ┌─────────────────────────────────────────┐ │
//!                     │  │          Cross-Cutting Concerns          │ │
//!                     │  │  ┌─────────┐  ┌───────────────────────┐ │ │
//!                     │  │  │ config  │  │      lifecycle        │ │ │
//!                     │  │  │         │  │ state machine/signals │ │ │
//!                     │  │  └─────────┘  └───────────────────────┘ │ │
//!                     │  └─────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────┘
//! ```
//!
//! The binary wires a handler registry with load-driver utility methods,
//! installs the signal bridge, and blocks on `serve()` until the lifecycle
//! reaches its terminal state. SIGINT/SIGTERM drain; a second signal forces
//! an immediate stop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rpcload::config::loader::load_config;
use rpcload::config::ServerConfig;
use rpcload::{HandlerRegistry, RpcServer, SignalBridge};

/// Command-line options. Everything else comes from the config file.
#[derive(Debug, Parser)]
#[command(name = "rpcload", about = "Load-test RPC server")]
struct Args {
    /// Port to run on (overrides the configured bind address port).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rpcload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rpcload v0.1.0 starting");

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.listener.set_port(port);
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    // Utility methods for load drivers; real workloads plug in their own.
    let registry = HandlerRegistry::builder()
        .register("ping", |_args| async move { Ok(b"\"pong\"".to_vec()) })
        .register("echo", |args| async move { Ok(args) })
        .build();

    let server = Arc::new(RpcServer::new(config, registry));

    let bridge = SignalBridge::install()?;
    tokio::spawn(bridge.run(Arc::clone(&server)));

    server.serve().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
