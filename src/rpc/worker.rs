//! Per-connection worker task.
//!
//! # Responsibilities
//! - Serial read → dispatch → respond loop for one connection
//! - Stop reading new requests once the server is draining
//! - Abandon in-flight work only on a forced stop
//! - Isolate failures: handler errors answer, transport errors close
//!
//! Requests on one connection are processed strictly in order; ordering
//! across connections is not defined.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::lifecycle::state::LifecycleState;
use crate::net::connection::ConnectionGuard;
use crate::net::listener::ConnectionPermit;
use crate::rpc::handler::{HandlerError, HandlerRegistry};
use crate::rpc::wire::{self, Request, Response, TransportError};

/// Worker driving one accepted connection to completion.
pub struct Worker {
    stream: TcpStream,
    peer: SocketAddr,
    guard: ConnectionGuard,
    _permit: ConnectionPermit,
    registry: Arc<HandlerRegistry>,
    state: watch::Receiver<LifecycleState>,
}

impl Worker {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        guard: ConnectionGuard,
        permit: ConnectionPermit,
        registry: Arc<HandlerRegistry>,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self {
            stream,
            peer,
            guard,
            _permit: permit,
            registry,
            state,
        }
    }

    /// Serve the connection until it closes, fails, or the server drains.
    pub async fn run(mut self) {
        let id = self.guard.id();
        tracing::debug!(connection_id = %id, peer_addr = %self.peer, "Worker started");

        loop {
            if self.state.borrow().is_stopping() {
                tracing::debug!(connection_id = %id, "Server draining, closing connection");
                break;
            }

            let payload = tokio::select! {
                read = wire::read_frame(&mut self.stream) => read,
                _ = self.state.wait_for(|s| s.is_stopping()) => {
                    tracing::debug!(connection_id = %id, "Server draining, closing idle connection");
                    break;
                }
            };

            let payload = match payload {
                Ok(payload) => payload,
                Err(TransportError::Closed) => {
                    tracing::trace!(connection_id = %id, "Peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "Transport failure");
                    break;
                }
            };

            if !self.serve_request(payload).await {
                break;
            }
        }
        // Dropping self releases the guard (active set) and the permit.
    }

    /// Handle one request frame. Returns whether the connection stays usable.
    async fn serve_request(&mut self, payload: Vec<u8>) -> bool {
        let id = self.guard.id();

        let request = match Request::decode(&payload) {
            Ok(request) => request,
            Err(e) => {
                // No reliable framing left to answer on; close the connection.
                tracing::warn!(connection_id = %id, error = %e, "Undecodable request envelope");
                return false;
            }
        };

        self.guard.begin_request();
        let args = request.args_bytes().to_vec();
        let dispatched = tokio::select! {
            result = self.registry.dispatch(&request.method, args) => Some(result),
            _ = self.state.wait_for(|s| *s == LifecycleState::Stopped) => None,
        };

        let Some(result) = dispatched else {
            self.guard.end_request();
            tracing::warn!(
                connection_id = %id,
                method = %request.method,
                "Forced stop, abandoning in-flight request"
            );
            return false;
        };

        let response = match result.and_then(|payload| {
            Response::from_payload(payload)
                .map_err(|e| HandlerError::failed(format!("handler produced invalid payload: {}", e)))
        }) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    connection_id = %id,
                    method = %request.method,
                    error = %e,
                    "Handler error"
                );
                Response::from_error(e.to_string())
            }
        };

        let encoded = match response.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(connection_id = %id, error = %e, "Failed to encode response");
                self.guard.end_request();
                return false;
            }
        };

        let written = wire::write_frame(&mut self.stream, &encoded).await;
        self.guard.end_request();

        match written {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Failed to write response");
                false
            }
        }
    }
}
