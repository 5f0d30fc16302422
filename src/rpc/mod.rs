//! RPC core subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → server.rs (dispatch loop: register, spawn worker)
//!     → worker.rs (read frame → dispatch → write response, per connection)
//!     → wire.rs (length-prefixed frames, request/response envelopes)
//!     → handler.rs (method name → handler function, fixed at construction)
//! ```
//!
//! # Design Decisions
//! - One worker task per connection; workers never block each other
//! - Handler payloads are opaque bytes; the core never parses them
//! - Handler failures become error responses; transport failures close
//!   only the connection they occurred on

pub mod handler;
pub mod server;
pub mod wire;
pub mod worker;

pub use handler::{HandlerError, HandlerRegistry, RegistryBuilder};
pub use server::{RpcServer, ServerError};
