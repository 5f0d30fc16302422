//! Client SDK for the load-test RPC server.

pub mod client;

pub use client::{ClientError, RpcClient};
