//! CSI protocol messages transmitted over the plugin socket.
//!
//! [`CsiMessage`] is the top-level envelope for all request and response
//! variants exchanged between the orchestrator side ([`CsiClient`]) and the
//! plugin ([`CsiServer`]).
//!
//! [`CsiClient`]: crate::transport::client::CsiClient
//! [`CsiServer`]: crate::transport::server::CsiServer

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CsiError;
use crate::types::*;

/// Top-level message envelope.
///
/// Each connection carries exactly one request followed by one response.
/// The client sends a *request* variant and the server replies with the
/// corresponding *response* variant (or [`CsiMessage::Error`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CsiMessage {
    // ----- Identity requests ----------------------------------------------
    /// Readiness probe.
    Probe,
    /// Query plugin info.
    GetPluginInfo,
    /// Query plugin capabilities.
    GetPluginCapabilities,

    // ----- Controller requests --------------------------------------------
    /// Create a new volume.
    CreateVolume(CreateVolumeRequest),
    /// Delete a volume.
    DeleteVolume(VolumeId),
    /// Attach a volume at the cluster level.
    ControllerPublishVolume(ControllerPublishVolumeRequest),
    /// Detach a volume.
    ControllerUnpublishVolume { volume_id: VolumeId, node_id: String },
    /// Validate volume capabilities.
    ValidateVolumeCapabilities {
        volume_id: VolumeId,
        capabilities: Vec<VolumeCapability>,
    },
    /// List volumes, `0` meaning no limit.
    ListVolumes { max_entries: u32 },
    /// Describe a single volume.
    ControllerGetVolume(VolumeId),
    /// Query remaining capacity.
    GetCapacity,
    /// Snapshot a volume.
    CreateSnapshot(CreateSnapshotRequest),
    /// Delete a snapshot.
    DeleteSnapshot(String),
    /// List snapshots.
    ListSnapshots { max_entries: u32 },
    /// Grow a volume.
    ControllerExpandVolume {
        volume_id: VolumeId,
        required_bytes: u64,
    },
    /// Change mutable volume parameters.
    ControllerModifyVolume {
        volume_id: VolumeId,
        mutable_parameters: HashMap<String, String>,
    },
    /// Query controller capabilities.
    ControllerGetCapabilities,

    // ----- Node requests --------------------------------------------------
    /// Stage a volume on this node.
    StageVolume(NodeStageVolumeRequest),
    /// Unstage a previously staged volume.
    UnstageVolume {
        volume_id: VolumeId,
        staging_target_path: String,
    },
    /// Publish (bind-mount) a volume into a target path.
    PublishVolume(NodePublishVolumeRequest),
    /// Unpublish a previously published volume.
    UnpublishVolume {
        volume_id: VolumeId,
        target_path: String,
    },
    /// Query the condition of a volume.
    GetVolumeStats {
        volume_id: VolumeId,
        volume_path: String,
    },
    /// Grow the filesystem of a published volume.
    NodeExpandVolume {
        volume_id: VolumeId,
        volume_path: String,
        required_bytes: u64,
    },
    /// Query node capabilities.
    GetNodeCapabilities,
    /// Query node info.
    GetNodeInfo,

    // ----- Responses -------------------------------------------------------
    /// A volume was successfully created.
    VolumeCreated(Volume),
    /// Publish context returned by a controller attach.
    PublishContext(HashMap<String, String>),
    /// Capabilities confirmed by validation.
    CapabilitiesConfirmed(Vec<VolumeCapability>),
    /// A list of volumes.
    VolumeList(Vec<VolumeEntry>),
    /// A single volume description.
    VolumeInfo(VolumeEntry),
    /// Available capacity in bytes.
    Capacity(u64),
    /// A snapshot was created.
    SnapshotCreated(Snapshot),
    /// A list of snapshots.
    SnapshotList(Vec<Snapshot>),
    /// New size of an expanded volume.
    VolumeExpanded(u64),
    /// Controller capabilities.
    ControllerCapabilitiesResponse(Vec<ControllerCapability>),
    /// Volume condition.
    VolumeStatsResponse(VolumeStats),
    /// Node capabilities.
    NodeCapabilitiesResponse(Vec<NodeCapability>),
    /// Plugin information.
    PluginInfoResponse(PluginInfo),
    /// Plugin capabilities.
    PluginCapabilitiesResponse(Vec<PluginCapability>),
    /// Node information.
    NodeInfoResponse(NodeInfo),
    /// Probe result.
    ProbeResult(bool),

    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(CsiError),
}

impl CsiMessage {
    /// Whether this variant is a response rather than a request.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Self::VolumeCreated(_)
                | Self::PublishContext(_)
                | Self::CapabilitiesConfirmed(_)
                | Self::VolumeList(_)
                | Self::VolumeInfo(_)
                | Self::Capacity(_)
                | Self::SnapshotCreated(_)
                | Self::SnapshotList(_)
                | Self::VolumeExpanded(_)
                | Self::ControllerCapabilitiesResponse(_)
                | Self::VolumeStatsResponse(_)
                | Self::NodeCapabilitiesResponse(_)
                | Self::PluginInfoResponse(_)
                | Self::PluginCapabilitiesResponse(_)
                | Self::NodeInfoResponse(_)
                | Self::ProbeResult(_)
                | Self::Ok
                | Self::Error(_)
        )
    }
}

impl std::fmt::Display for CsiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Probe => f.write_str("Probe"),
            Self::GetPluginInfo => f.write_str("GetPluginInfo"),
            Self::GetPluginCapabilities => f.write_str("GetPluginCapabilities"),
            Self::CreateVolume(req) => write!(f, "CreateVolume(name={})", req.name),
            Self::DeleteVolume(id) => write!(f, "DeleteVolume({})", id),
            Self::ControllerPublishVolume(req) => {
                write!(f, "ControllerPublishVolume({})", req.volume_id)
            }
            Self::ControllerUnpublishVolume { volume_id, .. } => {
                write!(f, "ControllerUnpublishVolume({})", volume_id)
            }
            Self::ValidateVolumeCapabilities { volume_id, .. } => {
                write!(f, "ValidateVolumeCapabilities({})", volume_id)
            }
            Self::ListVolumes { max_entries } => write!(f, "ListVolumes(max={})", max_entries),
            Self::ControllerGetVolume(id) => write!(f, "ControllerGetVolume({})", id),
            Self::GetCapacity => f.write_str("GetCapacity"),
            Self::CreateSnapshot(req) => write!(f, "CreateSnapshot(name={})", req.name),
            Self::DeleteSnapshot(id) => write!(f, "DeleteSnapshot({})", id),
            Self::ListSnapshots { .. } => f.write_str("ListSnapshots"),
            Self::ControllerExpandVolume { volume_id, .. } => {
                write!(f, "ControllerExpandVolume({})", volume_id)
            }
            Self::ControllerModifyVolume { volume_id, .. } => {
                write!(f, "ControllerModifyVolume({})", volume_id)
            }
            Self::ControllerGetCapabilities => f.write_str("ControllerGetCapabilities"),
            Self::StageVolume(req) => write!(f, "StageVolume({})", req.volume_id),
            Self::UnstageVolume { volume_id, .. } => write!(f, "UnstageVolume({})", volume_id),
            Self::PublishVolume(req) => write!(f, "PublishVolume({})", req.volume_id),
            Self::UnpublishVolume { volume_id, .. } => {
                write!(f, "UnpublishVolume({})", volume_id)
            }
            Self::GetVolumeStats { volume_id, .. } => write!(f, "GetVolumeStats({})", volume_id),
            Self::NodeExpandVolume { volume_id, .. } => {
                write!(f, "NodeExpandVolume({})", volume_id)
            }
            Self::GetNodeCapabilities => f.write_str("GetNodeCapabilities"),
            Self::GetNodeInfo => f.write_str("GetNodeInfo"),
            Self::VolumeCreated(v) => write!(f, "VolumeCreated({})", v.volume_id),
            Self::PublishContext(ctx) => write!(f, "PublishContext(keys={})", ctx.len()),
            Self::CapabilitiesConfirmed(caps) => {
                write!(f, "CapabilitiesConfirmed(count={})", caps.len())
            }
            Self::VolumeList(vs) => write!(f, "VolumeList(count={})", vs.len()),
            Self::VolumeInfo(entry) => write!(f, "VolumeInfo({})", entry.volume.volume_id),
            Self::Capacity(c) => write!(f, "Capacity({})", c),
            Self::SnapshotCreated(s) => write!(f, "SnapshotCreated({})", s.snapshot_id),
            Self::SnapshotList(ss) => write!(f, "SnapshotList(count={})", ss.len()),
            Self::VolumeExpanded(bytes) => write!(f, "VolumeExpanded({})", bytes),
            Self::ControllerCapabilitiesResponse(caps) => {
                write!(f, "ControllerCapabilities(count={})", caps.len())
            }
            Self::VolumeStatsResponse(stats) => {
                write!(f, "VolumeStats(abnormal={})", stats.condition.abnormal)
            }
            Self::NodeCapabilitiesResponse(caps) => {
                write!(f, "NodeCapabilities(count={})", caps.len())
            }
            Self::PluginInfoResponse(info) => write!(f, "PluginInfo(name={})", info.name),
            Self::PluginCapabilitiesResponse(caps) => {
                write!(f, "PluginCapabilities(count={})", caps.len())
            }
            Self::NodeInfoResponse(info) => write!(f, "NodeInfo({})", info.node_id),
            Self::ProbeResult(ok) => write!(f, "ProbeResult({})", ok),
            Self::Ok => f.write_str("Ok"),
            Self::Error(e) => write!(f, "Error({})", e),
        }
    }
}
