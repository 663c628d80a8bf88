//! Unix-socket server that runs in the plugin process and dispatches incoming
//! CSI requests to the appropriate trait implementations.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, instrument, warn};

use super::{read_message, write_message};
use crate::controller::CsiController;
use crate::error::CsiError;
use crate::identity::CsiIdentity;
use crate::message::CsiMessage;
use crate::node::CsiNode;

/// A CSI server that accepts socket connections and dispatches
/// [`CsiMessage`] requests to an [`CsiIdentity`] + [`CsiController`] +
/// [`CsiNode`] implementation.
pub struct CsiServer<T> {
    listener: UnixListener,
    path: PathBuf,
    handler: Arc<T>,
}

impl<T> CsiServer<T>
where
    T: CsiIdentity + CsiController + CsiNode + 'static,
{
    /// Bind a new server to the socket at `path`.
    ///
    /// A stale socket file left by a previous process is removed first, and
    /// the parent directory is created if needed.  Must be called from
    /// within a Tokio runtime.
    pub fn bind(path: impl AsRef<Path>, handler: Arc<T>) -> Result<Self, CsiError> {
        let path = path.as_ref().to_path_buf();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CsiError::TransportError(format!(
                    "remove stale socket {}: {e}",
                    path.display()
                )));
            }
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(CsiError::transport)?;
        }

        let listener = UnixListener::bind(&path).map_err(CsiError::transport)?;
        info!(path = %path.display(), "CSI server listening");
        Ok(Self {
            listener,
            path,
            handler,
        })
    }

    /// Accept connections in a loop until accepting fails.
    ///
    /// Each accepted connection is handled on its own Tokio task.
    pub async fn serve(&self) -> Result<(), CsiError> {
        loop {
            let (stream, _) = self.listener.accept().await.map_err(CsiError::transport)?;
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, &handler).await {
                    warn!(error = %e, "CSI connection error");
                }
            });
        }
    }

    /// Like [`Self::serve`], but returns `Ok(())` once `shutdown` completes.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> Result<(), CsiError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            res = self.serve() => res,
            () = shutdown => {
                info!(path = %self.path.display(), "CSI server shutting down");
                Ok(())
            }
        }
    }

    /// Process a single connection: read request → dispatch → write response.
    #[instrument(skip_all)]
    async fn handle_connection(mut stream: UnixStream, handler: &T) -> Result<(), CsiError> {
        let response = match read_message(&mut stream).await {
            Ok(request) => {
                debug!(%request, "CSI request received");
                Self::dispatch(handler, request).await
            }
            Err(e) => {
                error!(error = %e, "CSI request unreadable");
                CsiMessage::Error(CsiError::InvalidArgument(e.to_string()))
            }
        };

        debug!(%response, "CSI response");
        write_message(&mut stream, &response).await
    }

    /// Map a [`CsiMessage`] request to the correct trait method call and
    /// wrap the result in a response [`CsiMessage`].
    async fn dispatch(handler: &T, request: CsiMessage) -> CsiMessage {
        match request {
            // --- Identity ---------------------------------------------------
            CsiMessage::Probe => respond(handler.probe().await, CsiMessage::ProbeResult),
            CsiMessage::GetPluginInfo => respond(
                handler.get_plugin_info().await,
                CsiMessage::PluginInfoResponse,
            ),
            CsiMessage::GetPluginCapabilities => respond(
                handler.get_plugin_capabilities().await,
                CsiMessage::PluginCapabilitiesResponse,
            ),

            // --- Controller -------------------------------------------------
            CsiMessage::CreateVolume(req) => {
                respond(handler.create_volume(req).await, CsiMessage::VolumeCreated)
            }
            CsiMessage::DeleteVolume(id) => respond(handler.delete_volume(&id).await, ok),
            CsiMessage::ControllerPublishVolume(req) => respond(
                handler.controller_publish_volume(req).await,
                CsiMessage::PublishContext,
            ),
            CsiMessage::ControllerUnpublishVolume { volume_id, node_id } => respond(
                handler
                    .controller_unpublish_volume(&volume_id, &node_id)
                    .await,
                ok,
            ),
            CsiMessage::ValidateVolumeCapabilities {
                volume_id,
                capabilities,
            } => respond(
                handler
                    .validate_volume_capabilities(&volume_id, &capabilities)
                    .await,
                CsiMessage::CapabilitiesConfirmed,
            ),
            CsiMessage::ListVolumes { max_entries } => respond(
                handler.list_volumes(max_entries).await,
                CsiMessage::VolumeList,
            ),
            CsiMessage::ControllerGetVolume(id) => respond(
                handler.controller_get_volume(&id).await,
                CsiMessage::VolumeInfo,
            ),
            CsiMessage::GetCapacity => respond(handler.get_capacity().await, CsiMessage::Capacity),
            CsiMessage::CreateSnapshot(req) => respond(
                handler.create_snapshot(req).await,
                CsiMessage::SnapshotCreated,
            ),
            CsiMessage::DeleteSnapshot(id) => respond(handler.delete_snapshot(&id).await, ok),
            CsiMessage::ListSnapshots { max_entries } => respond(
                handler.list_snapshots(max_entries).await,
                CsiMessage::SnapshotList,
            ),
            CsiMessage::ControllerExpandVolume {
                volume_id,
                required_bytes,
            } => respond(
                handler
                    .controller_expand_volume(&volume_id, required_bytes)
                    .await,
                CsiMessage::VolumeExpanded,
            ),
            CsiMessage::ControllerModifyVolume {
                volume_id,
                mutable_parameters,
            } => respond(
                handler
                    .controller_modify_volume(&volume_id, mutable_parameters)
                    .await,
                ok,
            ),
            CsiMessage::ControllerGetCapabilities => respond(
                handler.controller_get_capabilities().await,
                CsiMessage::ControllerCapabilitiesResponse,
            ),

            // --- Node -------------------------------------------------------
            CsiMessage::StageVolume(req) => respond(handler.stage_volume(req).await, ok),
            CsiMessage::UnstageVolume {
                volume_id,
                staging_target_path,
            } => respond(
                handler
                    .unstage_volume(&volume_id, &staging_target_path)
                    .await,
                ok,
            ),
            CsiMessage::PublishVolume(req) => respond(handler.publish_volume(req).await, ok),
            CsiMessage::UnpublishVolume {
                volume_id,
                target_path,
            } => respond(
                handler.unpublish_volume(&volume_id, &target_path).await,
                ok,
            ),
            CsiMessage::GetVolumeStats {
                volume_id,
                volume_path,
            } => respond(
                handler.get_volume_stats(&volume_id, &volume_path).await,
                CsiMessage::VolumeStatsResponse,
            ),
            CsiMessage::NodeExpandVolume {
                volume_id,
                volume_path,
                required_bytes,
            } => respond(
                handler
                    .expand_volume(&volume_id, &volume_path, required_bytes)
                    .await,
                CsiMessage::VolumeExpanded,
            ),
            CsiMessage::GetNodeCapabilities => respond(
                handler.get_capabilities().await,
                CsiMessage::NodeCapabilitiesResponse,
            ),
            CsiMessage::GetNodeInfo => {
                respond(handler.get_info().await, CsiMessage::NodeInfoResponse)
            }

            // --- Response variants should never arrive as requests ----------
            other => {
                warn!(msg = %other, "unexpected message variant received as request");
                CsiMessage::Error(CsiError::InvalidArgument(format!(
                    "unexpected message: {other}"
                )))
            }
        }
    }

    /// Path of the socket this server listens on.
    pub fn local_path(&self) -> &Path {
        &self.path
    }
}

impl<T> Drop for CsiServer<T> {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Wrap a handler result in its response variant.
fn respond<R>(result: Result<R, CsiError>, wrap: impl FnOnce(R) -> CsiMessage) -> CsiMessage {
    match result {
        Ok(value) => wrap(value),
        Err(e) => CsiMessage::Error(e),
    }
}

fn ok(_: ()) -> CsiMessage {
    CsiMessage::Ok
}
