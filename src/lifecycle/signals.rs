//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into a graceful stop, exactly once
//! - Escalate a second signal to a forced stop
//!
//! # Design Decisions
//! - Owns its registrations; no ambient global signal state
//! - Uses Tokio's signal handling (async-safe)
//! - Further signals after the forced stop are not consumed; the forced
//!   stop already unblocks `serve()` and the process exits

use std::io;
use std::sync::Arc;

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::rpc::server::RpcServer;

/// Bridges OS termination signals into the server lifecycle.
pub struct SignalBridge {
    interrupt: Signal,
    terminate: Signal,
}

impl SignalBridge {
    /// Register handlers for SIGINT and SIGTERM.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Run the bridge: first signal stops the server gracefully, a second
    /// one forces an immediate stop. Consumes the bridge, so the stop path
    /// can only fire once.
    pub async fn run(mut self, server: Arc<RpcServer>) {
        self.recv_any().await;
        tracing::info!("Termination signal received, draining");
        if let Err(e) = server.stop() {
            tracing::debug!(error = %e, "Stop request ignored");
        }

        self.recv_any().await;
        tracing::warn!("Second termination signal, forcing stop");
        server.force_stop();
    }

    async fn recv_any(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}
