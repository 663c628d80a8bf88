//! Unix-socket client used by the orchestrator side to issue CSI requests.

use std::path::PathBuf;

use tokio::net::UnixStream;
use tracing::{debug, instrument};

use super::{read_message, write_message};
use crate::error::CsiError;
use crate::message::CsiMessage;

/// A lightweight CSI client that sends [`CsiMessage`] requests to the plugin
/// socket and returns the server's response.
///
/// Each request opens a fresh connection, so a client is cheap to clone and
/// share between tasks.
#[derive(Debug, Clone)]
pub struct CsiClient {
    path: PathBuf,
}

impl CsiClient {
    /// Create a client for the plugin socket at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Send a request and wait for the corresponding response.
    ///
    /// Error responses are returned as `Ok(CsiMessage::Error(_))`; use
    /// [`Self::call`] to turn them into `Err`.
    #[instrument(skip(self), fields(msg = %msg))]
    pub async fn request(&self, msg: &CsiMessage) -> Result<CsiMessage, CsiError> {
        let mut stream = UnixStream::connect(&self.path)
            .await
            .map_err(|e| CsiError::TransportError(format!("connect {}: {e}", self.path.display())))?;

        write_message(&mut stream, msg).await?;
        let response = read_message(&mut stream).await?;
        if !response.is_response() {
            return Err(CsiError::TransportError(format!(
                "server replied with request variant {response}"
            )));
        }

        debug!(%response, "CSI response received");
        Ok(response)
    }

    /// Send a request, mapping a [`CsiMessage::Error`] response to `Err`.
    pub async fn call(&self, msg: &CsiMessage) -> Result<CsiMessage, CsiError> {
        match self.request(msg).await? {
            CsiMessage::Error(e) => Err(e),
            response => Ok(response),
        }
    }
}
