//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits, close-on-drain)
//!     → connection.rs (active set, lifetime tracking)
//!     → Hand off to RPC worker
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so shutdown can drain instead of kill
//! - Closing the acceptor refuses new clients without touching live ones

pub mod connection;
pub mod listener;
