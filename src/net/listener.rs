//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Refuse further accepts once closed (drain support)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::config::ListenerConfig;

/// Error type for acceptor operations.
#[derive(Debug)]
pub enum AcceptorError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
    /// The acceptor was closed; no further connections will be produced.
    Closed,
}

impl std::fmt::Display for AcceptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptorError::Bind(e) => write!(f, "Failed to bind: {}", e),
            AcceptorError::Accept(e) => write!(f, "Failed to accept: {}", e),
            AcceptorError::Closed => write!(f, "Acceptor closed"),
        }
    }
}

impl std::error::Error for AcceptorError {}

/// A bounded TCP acceptor that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections wait until a slot becomes available. `close()` drops the
/// listening socket semantics for callers: pending and future `accept()`
/// calls fail with `Closed`.
pub struct Acceptor {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Close flag observed by in-flight accepts.
    closed: watch::Sender<bool>,
    /// Address actually bound (resolved, e.g. after binding port 0).
    local_addr: SocketAddr,
}

impl Acceptor {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, AcceptorError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            AcceptorError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(AcceptorError::Bind)?;

        let local_addr = listener.local_addr().map_err(AcceptorError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        let (closed, _) = watch::channel(false);

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            closed,
            local_addr,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Waits if the connection limit has been reached. Returns the stream,
    /// the peer address, and a permit that must be held for the connection's
    /// lifetime. Fails with `Closed` once `close()` has been called.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), AcceptorError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(AcceptorError::Closed);
        }

        tokio::select! {
            accepted = async {
                // Acquire permit first (backpressure), then accept.
                let permit = self
                    .connection_limit
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("Semaphore closed unexpectedly");

                let (stream, addr) = self.inner.accept().await.map_err(AcceptorError::Accept)?;
                Ok((stream, addr, ConnectionPermit { _permit: permit }))
            } => {
                if let Ok((_, addr, _)) = &accepted {
                    tracing::debug!(
                        peer_addr = %addr,
                        available_permits = self.connection_limit.available_permits(),
                        "Connection accepted"
                    );
                }
                accepted
            }
            _ = closed.wait_for(|c| *c) => Err(AcceptorError::Closed),
        }
    }

    /// Stop producing connections. Idempotent.
    ///
    /// In-flight and subsequent `accept()` calls fail with `Closed`; already
    /// accepted connections are unaffected.
    pub fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        tracing::info!(address = %self.local_addr, "Listener closed");
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Get the local address this acceptor is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool. This
/// ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections: 4,
        }
    }

    #[tokio::test]
    async fn bind_resolves_ephemeral_port() {
        let acceptor = Acceptor::bind(&test_config()).await.unwrap();
        assert_ne!(acceptor.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn bind_fails_on_invalid_address() {
        let config = ListenerConfig {
            bind_address: "nonsense".into(),
            max_connections: 4,
        };
        match Acceptor::bind(&config).await {
            Err(AcceptorError::Bind(_)) => {}
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn accept_fails_closed_after_close() {
        let acceptor = Acceptor::bind(&test_config()).await.unwrap();
        acceptor.close();
        acceptor.close(); // idempotent
        match acceptor.accept().await {
            Err(AcceptorError::Closed) => {}
            other => panic!("expected closed error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn close_interrupts_pending_accept() {
        let acceptor = std::sync::Arc::new(Acceptor::bind(&test_config()).await.unwrap());
        let pending = {
            let acceptor = acceptor.clone();
            tokio::spawn(async move { acceptor.accept().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        acceptor.close();
        match pending.await.unwrap() {
            Err(AcceptorError::Closed) => {}
            other => panic!("expected closed error, got {:?}", other),
        }
    }
}
