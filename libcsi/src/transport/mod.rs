//! Unix-socket transport layer for CSI messages.
//!
//! This module provides [`CsiClient`](client::CsiClient) and
//! [`CsiServer`](server::CsiServer) that exchange [`CsiMessage`] values over a
//! local Unix domain socket.  Every connection carries exactly one request:
//! the client writes the JSON-encoded request and shuts down its write half,
//! the server answers with one JSON-encoded response and closes.

pub mod client;
pub mod server;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CsiError;
use crate::message::CsiMessage;

/// Upper bound on the size of a single encoded message.
pub const MAX_MESSAGE_SIZE: u64 = 16 * 1024 * 1024;

/// Read one message until EOF.
async fn read_message<R>(reader: &mut R) -> Result<CsiMessage, CsiError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take(MAX_MESSAGE_SIZE + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(CsiError::transport)?;
    if buf.len() as u64 > MAX_MESSAGE_SIZE {
        return Err(CsiError::TransportError(format!(
            "message exceeds {MAX_MESSAGE_SIZE} bytes"
        )));
    }
    serde_json::from_slice(&buf)
        .map_err(|e| CsiError::TransportError(format!("malformed message: {e}")))
}

/// Write one message and close the write half.
async fn write_message<W>(writer: &mut W, msg: &CsiMessage) -> Result<(), CsiError>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(msg).map_err(CsiError::internal)?;
    writer
        .write_all(&payload)
        .await
        .map_err(CsiError::transport)?;
    writer.shutdown().await.map_err(CsiError::transport)?;
    Ok(())
}
