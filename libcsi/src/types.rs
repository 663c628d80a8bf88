//! Core CSI types: volumes, capabilities, requests, and topology.
//!
//! These types form the data model shared by the CSI traits, transport layer,
//! and backend implementations.  They are all [`Serialize`]/[`Deserialize`] so
//! they can be transmitted over the plugin socket as JSON.
//!
//! Request fields whose *kind* selects a code path (content source, access
//! type) are modelled as internally tagged enums.  Each carries an `Unknown`
//! catch-all so that a kind this plugin does not recognise still decodes and
//! can be rejected with [`CsiError::InvalidArgument`](crate::CsiError)
//! instead of failing at the transport layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Opaque, unique identifier for a volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl VolumeId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Access mode & capabilities
// ---------------------------------------------------------------------------

/// Describes how a volume may be accessed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-write on a single node.
    SingleNodeWriter,
    /// Read-only on a single node.
    SingleNodeReaderOnly,
    /// Read-only on many nodes.
    MultiNodeReaderOnly,
    /// Read-write on one node, read-only on the others.
    MultiNodeSingleWriter,
    /// Read-write on many nodes.
    MultiNodeMultiWriter,
    /// Read-write by a single workload on a single node.
    SingleNodeSingleWriter,
    /// Read-write by many workloads on a single node.
    SingleNodeMultiWriter,
}

/// How the volume is exposed to the workload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessType {
    /// Filesystem access through a mount.
    Mount {
        /// Filesystem type passed to the mount call; empty for bind mounts.
        #[serde(default)]
        fs_type: String,
        /// Additional mount flags (e.g. `"noatime"`).
        #[serde(default)]
        mount_flags: Vec<String>,
    },
    /// Raw block device access.
    Block,
    /// Any access type this plugin does not know about.
    #[serde(other)]
    Unknown,
}

/// Describes the capabilities required from a volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCapability {
    /// Requested access mode.
    pub access_mode: AccessMode,
    /// Requested access type.  A missing access type is an invalid request
    /// for node publish.
    #[serde(default)]
    pub access_type: Option<AccessType>,
}

impl VolumeCapability {
    /// A single-node-writer filesystem capability with the given mount
    /// parameters.
    pub fn mount(fs_type: impl Into<String>, mount_flags: Vec<String>) -> Self {
        Self {
            access_mode: AccessMode::SingleNodeWriter,
            access_type: Some(AccessType::Mount {
                fs_type: fs_type.into(),
                mount_flags,
            }),
        }
    }
}

impl Default for VolumeCapability {
    fn default() -> Self {
        Self::mount("", Vec::new())
    }
}

/// Desired size bounds for a new volume.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityRange {
    /// Volume must be at least this big.
    #[serde(default)]
    pub required_bytes: u64,
    /// Volume must not be bigger than this; `0` means unbounded.
    #[serde(default)]
    pub limit_bytes: u64,
}

/// Declared origin of a new volume's data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolumeContentSource {
    /// Restore from a snapshot.
    Snapshot {
        /// Snapshot to restore from.
        snapshot_id: String,
    },
    /// Clone an existing volume.
    Volume {
        /// Volume to clone.
        volume_id: VolumeId,
    },
    /// Any content source kind this plugin does not know about.
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Volume metadata
// ---------------------------------------------------------------------------

/// Volume description returned to the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    /// Unique volume identifier.
    pub volume_id: VolumeId,
    /// Provisioned capacity in bytes; `0` means unknown.
    #[serde(default)]
    pub capacity_bytes: u64,
    /// Opaque context passed from Controller to Node operations.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
    /// Content source the volume was created from, echoed back verbatim.
    #[serde(default)]
    pub content_source: Option<VolumeContentSource>,
    /// Topology constraints (e.g. node affinity).
    #[serde(default)]
    pub accessible_topology: Vec<Topology>,
}

/// A volume together with its publish status, as returned by `ListVolumes`
/// and `ControllerGetVolume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeEntry {
    /// The volume itself.
    pub volume: Volume,
    /// Nodes the volume is currently published on.
    #[serde(default)]
    pub published_node_ids: Vec<String>,
}

/// Topology constraint expressed as key-value segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Topology segments, e.g. `{"node": "node-01"}`.
    #[serde(default)]
    pub segments: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Volume lifecycle state
// ---------------------------------------------------------------------------

/// Lifecycle phase of a volume, derived from its registry record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolumeState {
    /// Volume has been created but not attached.
    Created,
    /// Volume is attached at the controller level.
    Attached,
    /// Volume has a staging path on a node.
    Staged,
    /// Volume is bind-mounted into a workload target path.
    Published,
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Attached => "attached",
            Self::Staged => "staged",
            Self::Published => "published",
        };
        f.write_str(s)
    }
}

/// Health of a volume as reported by `NodeGetVolumeStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCondition {
    /// `true` when the volume needs attention.
    pub abnormal: bool,
    /// Human-readable explanation, empty when healthy.
    #[serde(default)]
    pub message: String,
}

/// Result of `NodeGetVolumeStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeStats {
    /// Current condition of the volume.
    pub condition: VolumeCondition,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request to create a new volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    /// Human-readable name for the volume; names the backing directory.
    pub name: String,
    /// Desired capacity bounds.
    #[serde(default)]
    pub capacity_range: Option<CapacityRange>,
    /// Required capabilities.
    #[serde(default)]
    pub volume_capabilities: Vec<VolumeCapability>,
    /// Arbitrary parameters echoed back as the volume context.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Optional origin of the volume's data.
    #[serde(default)]
    pub volume_content_source: Option<VolumeContentSource>,
}

/// Request to attach a volume to a node at the controller level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerPublishVolumeRequest {
    /// Volume to attach.
    pub volume_id: VolumeId,
    /// Node the volume is being attached for.
    #[serde(default)]
    pub node_id: String,
    /// Requested capability.
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    /// Whether the attachment is read-only.
    #[serde(default)]
    pub readonly: bool,
    /// Opaque context carried from `CreateVolume`.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to stage a volume on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStageVolumeRequest {
    /// Volume to stage.
    pub volume_id: VolumeId,
    /// Node-local staging path,
    /// e.g. `/var/lib/kubelet/plugins/kubernetes.io/csi/<driver>/<hash>/globalmount`.
    pub staging_target_path: String,
    /// Requested capability.
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    /// Opaque context carried from `CreateVolume`.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to publish (bind-mount) a volume into a workload target path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePublishVolumeRequest {
    /// Volume to publish.
    pub volume_id: VolumeId,
    /// Staging path set by a prior `NodeStageVolume`, if any.
    #[serde(default)]
    pub staging_target_path: String,
    /// Target path the workload will use,
    /// e.g. `/var/lib/kubelet/pods/<pod-uid>/volumes/<vol-name>/mount`.
    pub target_path: String,
    /// Requested capability.  Must carry a mount access type.
    #[serde(default)]
    pub volume_capability: Option<VolumeCapability>,
    /// Whether the bind mount should be read-only.
    #[serde(default)]
    pub readonly: bool,
    /// Opaque context carried from `CreateVolume`.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to snapshot a volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSnapshotRequest {
    /// Volume to snapshot.
    pub source_volume_id: VolumeId,
    /// Name of the snapshot.
    pub name: String,
    /// Arbitrary parameters forwarded to the backend.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// A point-in-time copy of a volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique snapshot identifier.
    pub snapshot_id: String,
    /// Volume the snapshot was taken from.
    pub source_volume_id: VolumeId,
    /// Snapshot size in bytes.
    pub size_bytes: u64,
    /// Whether the snapshot can be used as a content source.
    pub ready_to_use: bool,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Optional controller RPCs advertised by `ControllerGetCapabilities`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ControllerCapability {
    /// `CreateVolume` / `DeleteVolume`.
    CreateDeleteVolume,
    /// `ControllerPublishVolume` / `ControllerUnpublishVolume`.
    PublishUnpublishVolume,
    /// `ListVolumes`.
    ListVolumes,
    /// `ListVolumes` reports published node ids.
    ListVolumesPublishedNodes,
}

/// Optional node RPCs advertised by `NodeGetCapabilities`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeCapability {
    /// `NodeStageVolume` / `NodeUnstageVolume`.
    StageUnstageVolume,
    /// Volume condition reporting.
    VolumeCondition,
    /// `NodeGetVolumeStats`.
    GetVolumeStats,
    /// Single-node multi-writer access mode.
    SingleNodeMultiWriter,
}

// ---------------------------------------------------------------------------
// Plugin & node info
// ---------------------------------------------------------------------------

/// Information about the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name, e.g. `"csi.test.k8s.io"`.
    pub name: String,
    /// Vendor-provided version string.
    pub vendor_version: String,
}

/// Capabilities advertised by the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PluginCapability {
    /// Plugin provides a Controller service.
    ControllerService,
    /// Plugin supports volume topology constraints.
    VolumeAccessibilityConstraints,
}

/// Information about the node on which the CSI Node service runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Unique node identifier.
    pub node_id: String,
    /// Maximum number of volumes the node can host; `0` means no limit.
    pub max_volumes: u64,
    /// Optional topology of this node.
    #[serde(default)]
    pub accessible_topology: Option<Topology>,
}
