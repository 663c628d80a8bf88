use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{HostPathDriver, remove_dir_all_if_exists, validate_volume_name};
use crate::controller::CsiController;
use crate::error::CsiError;
use crate::registry::VolumeRecord;
use crate::types::*;

#[async_trait]
impl CsiController for HostPathDriver {
    #[instrument(skip(self, req), fields(name = %req.name))]
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume, CsiError> {
        let volume_id = match &req.volume_content_source {
            None => VolumeId::generate(),
            Some(VolumeContentSource::Snapshot { .. }) => {
                return Err(CsiError::unimplemented("snapshot content source"));
            }
            // A clone takes over the identity of its source volume.
            Some(VolumeContentSource::Volume { volume_id }) if !volume_id.0.is_empty() => {
                volume_id.clone()
            }
            Some(VolumeContentSource::Volume { .. }) => VolumeId::generate(),
            Some(VolumeContentSource::Unknown) => {
                return Err(CsiError::InvalidArgument(
                    "invalid volume content source type".into(),
                ));
            }
        };

        validate_volume_name(&req.name)?;

        let path = self.volume_path(&req.name);
        tokio::fs::DirBuilder::new()
            .mode(0o755)
            .create(&path)
            .await
            .map_err(|e| CsiError::BackendError(format!("create dir {}: {e}", path.display())))?;

        if self.registry.contains(&volume_id) {
            warn!(%volume_id, "volume id already registered, overwriting entry");
        }
        self.registry
            .create(volume_id.clone(), VolumeRecord::new(&path));

        info!(%volume_id, path = %path.display(), "volume created");
        Ok(Volume {
            volume_id,
            capacity_bytes: req
                .capacity_range
                .map(|range| range.required_bytes)
                .unwrap_or_default(),
            volume_context: req.parameters,
            content_source: req.volume_content_source,
            accessible_topology: Vec::new(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), CsiError> {
        let _guard = self.locks.acquire(volume_id).await;

        let Some(record) = self.registry.lookup(volume_id) else {
            debug!(%volume_id, "volume unknown, nothing to delete");
            return Ok(());
        };

        // Directory first: a failed removal must leave the entry for a retry.
        remove_dir_all_if_exists(record.path())
            .await
            .map_err(|e| {
                CsiError::BackendError(format!("remove dir {}: {e}", record.path().display()))
            })?;
        self.registry.delete(volume_id);

        info!(%volume_id, "volume deleted");
        Ok(())
    }

    #[instrument(skip(self, req), fields(volume_id = %req.volume_id, node_id = %req.node_id))]
    async fn controller_publish_volume(
        &self,
        req: ControllerPublishVolumeRequest,
    ) -> Result<HashMap<String, String>, CsiError> {
        let record = self.registry.get(&req.volume_id)?;
        let mut status = record.lock().await;

        if status.attached {
            return Err(CsiError::VolumeAlreadyAttached(req.volume_id.to_string()));
        }
        status.attached = true;

        info!(volume_id = %req.volume_id, "volume attached");
        Ok(HashMap::new())
    }

    #[instrument(skip(self))]
    async fn controller_unpublish_volume(
        &self,
        volume_id: &VolumeId,
        node_id: &str,
    ) -> Result<(), CsiError> {
        let Some(record) = self.registry.lookup(volume_id) else {
            debug!(%volume_id, "volume unknown, nothing to detach");
            return Ok(());
        };

        record.lock().await.attached = false;
        info!(%volume_id, "volume detached");
        Ok(())
    }

    async fn validate_volume_capabilities(
        &self,
        _volume_id: &VolumeId,
        _capabilities: &[VolumeCapability],
    ) -> Result<Vec<VolumeCapability>, CsiError> {
        // Directories only support one writer on one node.
        Ok(vec![VolumeCapability {
            access_mode: AccessMode::SingleNodeWriter,
            access_type: None,
        }])
    }

    async fn list_volumes(&self, max_entries: u32) -> Result<Vec<VolumeEntry>, CsiError> {
        let mut entries = Vec::new();
        for (volume_id, record) in self.registry.enumerate(max_entries as usize) {
            entries.push(self.describe(&volume_id, &record).await);
        }
        Ok(entries)
    }

    async fn controller_get_volume(&self, volume_id: &VolumeId) -> Result<VolumeEntry, CsiError> {
        let record = self.registry.get(volume_id)?;
        Ok(self.describe(volume_id, &record).await)
    }

    async fn controller_get_capabilities(&self) -> Result<Vec<ControllerCapability>, CsiError> {
        Ok(vec![
            ControllerCapability::CreateDeleteVolume,
            ControllerCapability::PublishUnpublishVolume,
            ControllerCapability::ListVolumes,
            ControllerCapability::ListVolumesPublishedNodes,
        ])
    }
}
