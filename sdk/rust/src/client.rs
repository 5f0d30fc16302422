use serde_json::Value;
use tokio::net::{TcpStream, ToSocketAddrs};

use rpcload::rpc::wire::{self, Request, Response, TransportError};

/// Error type for client-side RPC calls.
#[derive(Debug)]
pub enum ClientError {
    /// Could not reach the server.
    Connect(std::io::Error),
    /// Frame-level failure on the wire.
    Transport(TransportError),
    /// Envelope or payload (de)serialization failure.
    Codec(serde_json::Error),
    /// The server answered with an RPC-level error.
    Rpc(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Connect(e) => write!(f, "connect failed: {}", e),
            ClientError::Transport(e) => write!(f, "transport error: {}", e),
            ClientError::Codec(e) => write!(f, "codec error: {}", e),
            ClientError::Rpc(message) => write!(f, "rpc error: {}", message),
        }
    }
}

impl std::error::Error for ClientError {}

/// One client connection to the RPC server.
///
/// Calls are request/response by default; `send` + `read_response` allow
/// pipelining several requests on the same connection.
pub struct RpcClient {
    stream: TcpStream,
}

impl RpcClient {
    /// Connect to a server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(ClientError::Connect)?;
        Ok(Self { stream })
    }

    /// Invoke a method and wait for its response.
    pub async fn call(&mut self, method: &str, args: Value) -> Result<Value, ClientError> {
        self.send(method, args).await?;
        self.read_response().await
    }

    /// Send a request without waiting for the response.
    pub async fn send(&mut self, method: &str, args: Value) -> Result<(), ClientError> {
        let request = Request::new(method, &args).map_err(ClientError::Codec)?;
        let encoded = request.encode().map_err(ClientError::Codec)?;
        wire::write_frame(&mut self.stream, &encoded)
            .await
            .map_err(ClientError::Transport)
    }

    /// Read the next response on this connection.
    pub async fn read_response(&mut self) -> Result<Value, ClientError> {
        let payload = wire::read_frame(&mut self.stream)
            .await
            .map_err(ClientError::Transport)?;
        let response = Response::decode(&payload).map_err(ClientError::Transport)?;

        if let Some(message) = response.error {
            return Err(ClientError::Rpc(message));
        }
        match response.result {
            Some(raw) => serde_json::from_str(raw.get()).map_err(ClientError::Codec),
            None => Ok(Value::Null),
        }
    }
}
