//! Load-Test RPC Server Library

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod rpc;

pub use config::ServerConfig;
pub use lifecycle::signals::SignalBridge;
pub use lifecycle::state::LifecycleState;
pub use rpc::handler::{HandlerError, HandlerRegistry, RegistryBuilder};
pub use rpc::server::{RpcServer, ServerError};
