//! Frame codec and RPC envelopes.
//!
//! # Responsibilities
//! - Length-prefixed framing: u32 big-endian length, then payload
//! - JSON request/response envelopes with opaque raw payloads
//! - Distinguish clean connection close from mid-frame failures
//!
//! # Design Decisions
//! - `args`/`result` are carried as raw JSON so the core never parses
//!   handler payload contents
//! - Frames above `MAX_FRAME_LEN` are rejected before allocation

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame's payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Error type for per-connection transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection at a frame boundary.
    #[error("connection closed")]
    Closed,
    /// I/O failure, including truncation mid-frame.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Declared frame length exceeds `MAX_FRAME_LEN`.
    #[error("frame of {0} bytes exceeds limit")]
    Oversized(usize),
    /// The frame payload is not a valid envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Read one length-prefixed frame.
///
/// A clean EOF before any header byte reads as `Closed`; truncation inside
/// the header or payload is an `Io` error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_u8().await {
        Ok(first) => header[0] = first,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Closed)
        }
        Err(e) => return Err(TransportError::Io(e)),
    }
    reader.read_exact(&mut header[1..]).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Oversized(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write one length-prefixed frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::Oversized(payload.len()));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// One RPC request envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    /// Method name resolved against the handler registry.
    pub method: String,
    /// Opaque argument payload; absent reads as JSON `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Box<RawValue>>,
}

impl Request {
    /// Build a request from a JSON argument value.
    pub fn new(
        method: impl Into<String>,
        args: &serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: method.into(),
            args: Some(RawValue::from_string(serde_json::to_string(args)?)?),
        })
    }

    /// Decode a request envelope from a frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encode this envelope into a frame payload.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// The raw argument bytes handed to the handler, `null` when absent.
    pub fn args_bytes(&self) -> &[u8] {
        self.args
            .as_deref()
            .map(|raw| raw.get().as_bytes())
            .unwrap_or(b"null")
    }
}

/// One RPC response envelope: a result or an error, never both.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    /// Opaque result payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawValue>>,
    /// Error message when the handler failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Wrap a handler's result payload. Fails if the payload is not JSON.
    pub fn from_payload(payload: Vec<u8>) -> Result<Self, serde_json::Error> {
        let text = String::from_utf8(payload)
            .map_err(|e| <serde_json::Error as serde::de::Error>::custom(e))?;
        Ok(Self {
            result: Some(RawValue::from_string(text)?),
            error: None,
        })
    }

    /// Build an error response.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    /// Decode a response envelope from a frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encode this envelope into a frame payload.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_eof_reads_as_closed() {
        let (mut client, server) = tokio::io::duplex(64);
        drop(server);
        match read_frame(&mut client).await {
            Err(TransportError::Closed) => {}
            other => panic!("expected closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn truncated_payload_is_io_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        server.write_u32(100).await.unwrap();
        server.write_all(b"short").await.unwrap();
        drop(server);
        match read_frame(&mut client).await {
            Err(TransportError::Io(_)) => {}
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_frame_rejected_before_allocation() {
        let (mut client, mut server) = tokio::io::duplex(64);
        server.write_u32(u32::MAX).await.unwrap();
        match read_frame(&mut client).await {
            Err(TransportError::Oversized(_)) => {}
            other => panic!("expected oversized, got {:?}", other),
        }
    }

    #[test]
    fn missing_args_read_as_null() {
        let request = Request::decode(br#"{"method":"ping"}"#).unwrap();
        assert_eq!(request.method, "ping");
        assert_eq!(request.args_bytes(), b"null");
    }

    #[test]
    fn args_survive_as_raw_bytes() {
        let request = Request::decode(br#"{"method":"echo","args":[1, 2, 3]}"#).unwrap();
        assert_eq!(request.args_bytes(), b"[1, 2, 3]");
    }

    #[test]
    fn non_json_handler_payload_rejected() {
        assert!(Response::from_payload(b"not json".to_vec()).is_err());
        assert!(Response::from_payload(vec![0xff, 0xfe]).is_err());
    }
}
