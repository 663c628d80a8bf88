//! # libcsi: host-path CSI plugin for RK8s
//!
//! `libcsi` implements a lightweight [Container Storage Interface][csi]
//! plugin whose volumes are plain directories on the local host.  The
//! orchestrator drives each volume through create → attach → stage →
//! publish and back; the plugin tracks that lifecycle in an in-memory
//! registry that stays consistent under concurrent and retried calls.
//! It follows the RK8s architecture conventions (Tokio async runtime,
//! `tracing` for observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `Volume`, `VolumeId`, capabilities, requests. |
//! | [`error`] | [`CsiError`] enum and its categorical [`ErrorCode`]. |
//! | [`registry`] | [`VolumeRegistry`]: concurrency-safe volume state table. |
//! | [`mount`] | [`Mounter`] trait and the `nix`-based [`SystemMounter`]. |
//! | [`message`] | [`CsiMessage`] protocol envelope for the socket transport. |
//! | [`identity`] | [`CsiIdentity`] trait: plugin discovery & health. |
//! | [`controller`] | [`CsiController`] trait: create/delete, attach/detach. |
//! | [`node`] | [`CsiNode`] trait: stage, publish, unpublish, unstage. |
//! | [`transport`] | Unix-socket client/server. |
//! | [`backend`] | Storage backends (host path). |
//!
//! [csi]: https://github.com/container-storage-interface/spec

pub mod backend;
pub mod controller;
pub mod error;
pub mod identity;
pub mod message;
pub mod mount;
pub mod node;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use backend::hostpath::{DriverConfig, HostPathDriver};
pub use controller::CsiController;
pub use error::{CsiError, ErrorCode};
pub use identity::CsiIdentity;
pub use message::CsiMessage;
pub use mount::{Mounter, SystemMounter};
pub use node::CsiNode;
pub use registry::{VolumeRecord, VolumeRegistry, VolumeStatus};
pub use types::*;
