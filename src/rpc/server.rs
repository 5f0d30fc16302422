//! RPC server: lifecycle controller and dispatch loop.
//!
//! # Responsibilities
//! - Own the lifecycle state machine (Idle → Running → Draining → Stopped)
//! - Bind the acceptor and run the accept/dispatch loop
//! - Spawn one worker task per connection
//! - Drain in-flight work on stop instead of killing it
//!
//! # Design Decisions
//! - `serve()` runs on the caller's task and returns only once stopped,
//!   so the binary's exit code follows the lifecycle directly
//! - State is published through a watch channel; the acceptor loop and
//!   every worker observe transitions at their suspension points
//! - `stop()` closes the acceptor first; the active set draining to empty
//!   is the only condition for reaching Stopped

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::lifecycle::state::LifecycleState;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Acceptor, AcceptorError};
use crate::rpc::handler::HandlerRegistry;
use crate::rpc::worker::Worker;

/// Error type for lifecycle operations.
#[derive(Debug)]
pub enum ServerError {
    /// The listening endpoint could not be bound.
    Bind(AcceptorError),
    /// `serve()` was called more than once.
    AlreadyStarted,
    /// `stop()` was called before the server ever ran.
    NotRunning,
    /// The server has already reached its terminal state.
    Stopped,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(e) => write!(f, "Failed to start: {}", e),
            ServerError::AlreadyStarted => write!(f, "Server already started"),
            ServerError::NotRunning => write!(f, "Server is not running"),
            ServerError::Stopped => write!(f, "Server stopped"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind(e) => Some(e),
            _ => None,
        }
    }
}

/// One bound RPC service instance.
///
/// Created idle; `serve()` binds and blocks until the instance reaches
/// `Stopped`. Not restartable: a stopped server is destroyed, not reused.
pub struct RpcServer {
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
    state: watch::Sender<LifecycleState>,
    tracker: ConnectionTracker,
    serve_claim: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
}

impl RpcServer {
    /// Create an idle server instance.
    pub fn new(config: ServerConfig, registry: Arc<HandlerRegistry>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            config,
            registry,
            state,
            tracker: ConnectionTracker::new(),
            serve_claim: AtomicBool::new(false),
            local_addr: OnceLock::new(),
        }
    }

    /// Bind the acceptor and serve until stopped.
    ///
    /// Only legal once per instance; a second call fails with
    /// `AlreadyStarted` (or `Stopped` once the instance has terminated)
    /// without perturbing the running lifecycle. Returns after the drain
    /// completes and the instance reaches `Stopped`.
    pub async fn serve(&self) -> Result<(), ServerError> {
        if self.serve_claim.swap(true, Ordering::SeqCst) {
            return Err(match *self.state.borrow() {
                LifecycleState::Stopped => ServerError::Stopped,
                _ => ServerError::AlreadyStarted,
            });
        }

        let acceptor = Acceptor::bind(&self.config.listener)
            .await
            .map_err(ServerError::Bind)?;
        let _ = self.local_addr.set(acceptor.local_addr());

        self.transition(LifecycleState::Running);
        self.dispatch(acceptor).await;

        let active = self.tracker.active_count();
        if active > 0 {
            tracing::info!(active_connections = active, "Draining connections");
        }
        self.tracker.drained().await;

        self.transition(LifecycleState::Stopped);
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Request a graceful stop.
    ///
    /// Legal from `Running` or `Draining` (where it is a no-op). Closes the
    /// acceptor so new connects are refused, while existing workers finish
    /// their current request.
    pub fn stop(&self) -> Result<(), ServerError> {
        let current = *self.state.borrow();
        match current {
            LifecycleState::Idle => Err(ServerError::NotRunning),
            LifecycleState::Stopped => Err(ServerError::Stopped),
            _ => {
                self.transition(LifecycleState::Draining);
                Ok(())
            }
        }
    }

    /// Force an immediate stop, abandoning in-flight requests.
    ///
    /// Workers observe the jump to `Stopped` at their next suspension point
    /// and bail out; the drain wait then completes as their guards drop.
    pub fn force_stop(&self) {
        if self.transition(LifecycleState::Stopped) {
            tracing::warn!(
                abandoned_connections = self.tracker.active_count(),
                "Forced stop"
            );
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Address actually bound, available once `Running` is reached.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Number of connections currently in the active set.
    pub fn active_connections(&self) -> usize {
        self.tracker.active_count()
    }

    /// Accept loop: spawn a worker per connection until shutdown begins.
    ///
    /// The acceptor is closed as soon as the state leaves `Running`, so a
    /// connect attempt during the drain is refused. Dropping the acceptor on
    /// return releases the listening socket.
    async fn dispatch(&self, acceptor: Acceptor) {
        let mut state_rx = self.state.subscribe();
        loop {
            tokio::select! {
                accepted = acceptor.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let guard = self.tracker.register(peer);
                        let worker = Worker::new(
                            stream,
                            peer,
                            guard,
                            permit,
                            Arc::clone(&self.registry),
                            self.state.subscribe(),
                        );
                        tokio::spawn(worker.run());
                    }
                    Err(AcceptorError::Closed) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                },
                _ = state_rx.wait_for(|s| s.is_stopping()), if !acceptor.is_closed() => {
                    acceptor.close();
                }
            }
        }
    }

    /// Advance the state machine, enforcing forward-only transitions.
    /// Returns whether the state actually changed.
    fn transition(&self, next: LifecycleState) -> bool {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if next > *current {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });
        if let Some(previous) = previous {
            tracing::info!(from = %previous, to = %next, "Lifecycle transition");
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("active_connections", &self.active_connections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_server() -> RpcServer {
        RpcServer::new(ServerConfig::default(), HandlerRegistry::builder().build())
    }

    #[tokio::test]
    async fn stop_before_serve_is_rejected() {
        let server = idle_server();
        assert!(matches!(server.stop(), Err(ServerError::NotRunning)));
        assert_eq!(server.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn stop_after_forced_stop_is_rejected() {
        let server = idle_server();
        server.force_stop();
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(matches!(server.stop(), Err(ServerError::Stopped)));
    }

    #[tokio::test]
    async fn transitions_never_move_backwards() {
        let server = idle_server();
        assert!(server.transition(LifecycleState::Draining));
        assert!(!server.transition(LifecycleState::Running));
        assert_eq!(server.state(), LifecycleState::Draining);
    }
}
