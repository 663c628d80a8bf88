//! CSI Node service trait.
//!
//! The Node service runs on each worker node and handles the local filesystem
//! operations required to make a volume available to a workload:
//!
//! 1. **Stage**: record the node-local staging path of an attached volume.
//! 2. **Publish**: bind-mount the volume's directory into the target path.
//! 3. **Unpublish**: remove the bind-mount and the directories behind it.
//! 4. **Unstage**: forget the staging path.

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{
    NodeCapability, NodeInfo, NodePublishVolumeRequest, NodeStageVolumeRequest, VolumeId,
    VolumeStats,
};

/// Node service: local mount / unmount operations.
#[async_trait]
pub trait CsiNode: Send + Sync {
    /// Stage a volume at the given staging path.
    ///
    /// Not idempotent: staging an already-staged volume fails with
    /// [`CsiError::VolumeAlreadyStaged`].
    async fn stage_volume(&self, req: NodeStageVolumeRequest) -> Result<(), CsiError>;

    /// Unstage a volume.
    ///
    /// This is idempotent: calling it on an unknown or already-unstaged
    /// volume succeeds without error.
    async fn unstage_volume(
        &self,
        volume_id: &VolumeId,
        staging_target_path: &str,
    ) -> Result<(), CsiError>;

    /// Publish a volume: bind-mount its directory into the target path.
    ///
    /// This is idempotent: calling it again for a target that is already a
    /// mount point succeeds without remounting.
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError>;

    /// Unpublish a volume from `target_path`.
    ///
    /// This is idempotent: a target that does not match the recorded
    /// publish path is treated as already unpublished.
    async fn unpublish_volume(
        &self,
        volume_id: &VolumeId,
        target_path: &str,
    ) -> Result<(), CsiError>;

    /// Report the condition of a volume.
    async fn get_volume_stats(
        &self,
        volume_id: &VolumeId,
        volume_path: &str,
    ) -> Result<VolumeStats, CsiError>;

    /// Advertise the optional node RPCs this plugin implements.
    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError>;

    /// Return information about the node on which this service is running.
    async fn get_info(&self) -> Result<NodeInfo, CsiError>;

    /// Grow the filesystem of a published volume.
    async fn expand_volume(
        &self,
        _volume_id: &VolumeId,
        _volume_path: &str,
        _required_bytes: u64,
    ) -> Result<u64, CsiError> {
        Err(CsiError::unimplemented("NodeExpandVolume"))
    }
}
