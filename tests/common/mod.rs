//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use rpcload::config::ServerConfig;
use rpcload::{HandlerError, HandlerRegistry, LifecycleState, RpcServer, ServerError};

/// Registry with the utility methods the tests drive.
pub fn test_registry() -> Arc<HandlerRegistry> {
    HandlerRegistry::builder()
        .register("ping", |_args| async move { Ok(b"\"pong\"".to_vec()) })
        .register("echo", |args| async move { Ok(args) })
        .register("fail", |_args| async move {
            Err(HandlerError::failed("simulated failure"))
        })
        .register("slow", |args| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(args)
        })
        .register("hang", |_args| async move {
            // Completes only if the server abandons it.
            std::future::pending::<()>().await;
            Ok(Vec::new())
        })
        .register("garbage", |_args| async move { Ok(b"not json".to_vec()) })
        .build()
}

/// Spawn a server on an ephemeral port; returns once it is accepting.
pub async fn start_server(
    registry: Arc<HandlerRegistry>,
) -> (Arc<RpcServer>, SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();

    let server = Arc::new(RpcServer::new(config, registry));
    let handle = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve().await })
    };

    let mut state = server.subscribe_state();
    state
        .wait_for(|s| *s >= LifecycleState::Running)
        .await
        .expect("server task alive");
    let addr = server
        .local_addr()
        .expect("bound address available once running");

    (server, addr, handle)
}
