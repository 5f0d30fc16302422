//! Dispatch tests: request routing, ordering, and fault isolation.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::io::AsyncReadExt;

use rpcload::rpc::wire;
use sdk_rust::{ClientError, RpcClient};

mod common;

#[tokio::test]
async fn ping_returns_pong() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut client = RpcClient::connect(addr).await.unwrap();
    assert_eq!(client.call("ping", json!([])).await.unwrap(), json!("pong"));
    drop(client);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn responses_preserve_request_order() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut client = RpcClient::connect(addr).await.unwrap();
    for i in 0..20 {
        client.send("echo", json!(i)).await.unwrap();
    }
    for i in 0..20 {
        assert_eq!(client.read_response().await.unwrap(), json!(i));
    }
    drop(client);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn handler_failure_keeps_connection_usable() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut client = RpcClient::connect(addr).await.unwrap();
    match client.call("fail", json!(null)).await {
        Err(ClientError::Rpc(message)) => assert!(message.contains("simulated failure")),
        other => panic!("expected rpc error, got {:?}", other.map(|_| ())),
    }
    // The same connection keeps serving.
    assert_eq!(client.call("ping", json!(null)).await.unwrap(), json!("pong"));

    match client.call("no_such_method", json!(null)).await {
        Err(ClientError::Rpc(message)) => assert!(message.contains("unknown method")),
        other => panic!("expected rpc error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(client.call("ping", json!(null)).await.unwrap(), json!("pong"));
    drop(client);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_handler_payload_becomes_rpc_error() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut client = RpcClient::connect(addr).await.unwrap();
    match client.call("garbage", json!(null)).await {
        Err(ClientError::Rpc(message)) => assert!(message.contains("invalid payload")),
        other => panic!("expected rpc error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(client.call("ping", json!(null)).await.unwrap(), json!("pong"));
    drop(client);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn malformed_frame_closes_only_its_connection() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut healthy = RpcClient::connect(addr).await.unwrap();
    let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();

    // Well-framed, but the payload is not a request envelope.
    wire::write_frame(&mut raw, b"this is not an envelope")
        .await
        .unwrap();

    // The offending connection is closed without a response.
    let mut buf = [0u8; 1];
    assert_eq!(raw.read(&mut buf).await.unwrap(), 0);

    // Other connections are unaffected.
    assert_eq!(healthy.call("ping", json!(null)).await.unwrap(), json!("pong"));
    drop(healthy);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn slow_connection_does_not_block_others() {
    let (server, addr, handle) = common::start_server(common::test_registry()).await;

    let mut slow = RpcClient::connect(addr).await.unwrap();
    slow.send("slow", json!("slow-payload")).await.unwrap();

    let mut fast = RpcClient::connect(addr).await.unwrap();
    let start = Instant::now();
    assert_eq!(fast.call("ping", json!(null)).await.unwrap(), json!("pong"));
    assert!(
        start.elapsed() < Duration::from_millis(200),
        "fast connection stalled behind a slow one"
    );

    // The slow request still completes on its own connection.
    assert_eq!(slow.read_response().await.unwrap(), json!("slow-payload"));
    drop(slow);
    drop(fast);

    server.stop().unwrap();
    handle.await.unwrap().unwrap();
}
