//! CSI Controller service trait.
//!
//! The Controller service manages the cluster-level volume lifecycle:
//! creation, deletion, attach / detach, capability validation and listing.
//! It is invoked by the orchestrator's central controller process.
//!
//! Snapshot, capacity, expansion and modification RPCs have default
//! implementations that fail with [`CsiError::Unimplemented`]; a backend only
//! overrides the ones it supports.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{
    ControllerCapability, ControllerPublishVolumeRequest, CreateSnapshotRequest,
    CreateVolumeRequest, Snapshot, Volume, VolumeCapability, VolumeEntry, VolumeId,
};

/// Controller service: centralized volume management.
#[async_trait]
pub trait CsiController: Send + Sync {
    /// Provision a new volume.
    ///
    /// The returned [`Volume`] contains the assigned `volume_id` and
    /// `volume_context` that must be forwarded to subsequent Node operations.
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume, CsiError>;

    /// Delete a previously provisioned volume.  Deleting an unknown volume
    /// succeeds.
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), CsiError>;

    /// Attach a volume at the cluster level.
    ///
    /// Returns the publish context handed to the node on stage / publish.
    async fn controller_publish_volume(
        &self,
        req: ControllerPublishVolumeRequest,
    ) -> Result<HashMap<String, String>, CsiError>;

    /// Detach a volume.  Detaching an unknown or detached volume succeeds.
    async fn controller_unpublish_volume(
        &self,
        volume_id: &VolumeId,
        node_id: &str,
    ) -> Result<(), CsiError>;

    /// Return the subset of `capabilities` this plugin confirms for the
    /// volume.
    async fn validate_volume_capabilities(
        &self,
        volume_id: &VolumeId,
        capabilities: &[VolumeCapability],
    ) -> Result<Vec<VolumeCapability>, CsiError>;

    /// List up to `max_entries` volumes (`0` means all).
    async fn list_volumes(&self, max_entries: u32) -> Result<Vec<VolumeEntry>, CsiError>;

    /// Describe a single volume.
    async fn controller_get_volume(&self, volume_id: &VolumeId) -> Result<VolumeEntry, CsiError>;

    /// Advertise the optional controller RPCs this plugin implements.
    async fn controller_get_capabilities(&self) -> Result<Vec<ControllerCapability>, CsiError>;

    /// Return the total available capacity in bytes.
    async fn get_capacity(&self) -> Result<u64, CsiError> {
        Err(CsiError::unimplemented("GetCapacity"))
    }

    /// Take a snapshot of a volume.
    async fn create_snapshot(&self, _req: CreateSnapshotRequest) -> Result<Snapshot, CsiError> {
        Err(CsiError::unimplemented("CreateSnapshot"))
    }

    /// Delete a snapshot.
    async fn delete_snapshot(&self, _snapshot_id: &str) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("DeleteSnapshot"))
    }

    /// List snapshots.
    async fn list_snapshots(&self, _max_entries: u32) -> Result<Vec<Snapshot>, CsiError> {
        Err(CsiError::unimplemented("ListSnapshots"))
    }

    /// Grow a volume to at least `required_bytes`, returning the new size.
    async fn controller_expand_volume(
        &self,
        _volume_id: &VolumeId,
        _required_bytes: u64,
    ) -> Result<u64, CsiError> {
        Err(CsiError::unimplemented("ControllerExpandVolume"))
    }

    /// Change mutable volume parameters.
    async fn controller_modify_volume(
        &self,
        _volume_id: &VolumeId,
        _mutable_parameters: HashMap<String, String>,
    ) -> Result<(), CsiError> {
        Err(CsiError::unimplemented("ControllerModifyVolume"))
    }
}
