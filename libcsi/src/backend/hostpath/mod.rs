//! Host-path storage backend for CSI.
//!
//! [`HostPathDriver`] implements [`CsiIdentity`](crate::CsiIdentity),
//! [`CsiController`](crate::CsiController), and [`CsiNode`](crate::CsiNode)
//! on top of plain local directories.  Volumes are directories; publishing
//! bind-mounts a volume's directory onto the workload's target path.
//!
//! # On-disk layout
//!
//! ```text
//! <volume_root>/
//!   <volume-name>/          # created by CreateVolume
//! <data_dir>/
//!   <volume-id>/            # created by NodePublishVolume for unknown ids
//! ```
//!
//! There is no metadata sidecar: the [`VolumeRegistry`] is the only record of
//! a volume's lifecycle state and does not survive a restart.

mod controller;
mod identity;
mod node;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CsiError;
use crate::mount::Mounter;
use crate::registry::{VolumeLocks, VolumeRecord, VolumeRegistry};
use crate::types::{Volume, VolumeEntry, VolumeId};

/// Plugin name reported by `GetPluginInfo` unless overridden.
pub const DEFAULT_DRIVER_NAME: &str = "csi.test.k8s.io";

/// Directory under which `CreateVolume` creates one directory per volume name.
pub const DEFAULT_VOLUME_ROOT: &str = "/csi";

/// Directory under which `NodePublishVolume` creates directories for volumes
/// it has not seen before.
pub const DEFAULT_DATA_DIR: &str = "/csi-data-dir";

/// Volume context key carrying the backing directory.
pub const CONTEXT_PATH: &str = "path";

/// Volume context key carrying the derived lifecycle phase.
pub const CONTEXT_STATE: &str = "state";

/// Static configuration of a [`HostPathDriver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Name reported by `GetPluginInfo`.
    pub driver_name: String,
    /// Identifier reported by `NodeGetInfo` and recorded on publish.
    pub node_id: String,
    /// Parent directory of volumes created by `CreateVolume`.
    pub volume_root: PathBuf,
    /// Parent directory of volumes first seen by `NodePublishVolume`.
    pub data_dir: PathBuf,
    /// Require publish to target a registered, attached and staged volume
    /// instead of re-registering it.
    pub strict_publish: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver_name: DEFAULT_DRIVER_NAME.to_owned(),
            node_id: uuid::Uuid::new_v4().to_string(),
            volume_root: PathBuf::from(DEFAULT_VOLUME_ROOT),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            strict_publish: false,
        }
    }
}

/// Concrete CSI driver backed by local directories.
///
/// # Thread safety
///
/// Volume state lives in the shared [`VolumeRegistry`]; node operations take
/// a per-volume operation lock from [`VolumeLocks`], so different volumes are
/// mounted and unmounted concurrently while calls on the same volume are
/// serialized.
pub struct HostPathDriver {
    config: DriverConfig,
    registry: Arc<VolumeRegistry>,
    mounter: Arc<dyn Mounter>,
    locks: VolumeLocks,
}

impl HostPathDriver {
    /// Create a driver over an externally owned registry.
    pub fn new(
        config: DriverConfig,
        registry: Arc<VolumeRegistry>,
        mounter: Arc<dyn Mounter>,
    ) -> Self {
        Self {
            config,
            registry,
            mounter,
            locks: VolumeLocks::new(),
        }
    }

    /// The driver configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The registry this driver operates on.
    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        &self.registry
    }

    /// Directory `CreateVolume` uses for a volume called `name`.
    fn volume_path(&self, name: &str) -> PathBuf {
        self.config.volume_root.join(name)
    }

    /// Directory `NodePublishVolume` uses for an unregistered volume.
    fn data_path(&self, volume_id: &VolumeId) -> PathBuf {
        self.config.data_dir.join(volume_id.as_str())
    }

    /// Build the list / get representation of a registered volume.
    async fn describe(&self, volume_id: &VolumeId, record: &VolumeRecord) -> VolumeEntry {
        let status = record.snapshot().await;
        VolumeEntry {
            volume: Volume {
                volume_id: volume_id.clone(),
                volume_context: HashMap::from([
                    (
                        CONTEXT_PATH.to_owned(),
                        record.path().to_string_lossy().into_owned(),
                    ),
                    (CONTEXT_STATE.to_owned(), status.state().to_string()),
                ]),
                ..Default::default()
            },
            published_node_ids: status.publish_node.into_iter().collect(),
        }
    }
}

/// Reject volume names that are not a single plain path component.
fn validate_volume_name(name: &str) -> Result<(), CsiError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(_)), None) => Ok(()),
        _ if name.is_empty() => Err(CsiError::InvalidArgument(
            "volume name must not be empty".into(),
        )),
        _ => Err(CsiError::InvalidArgument(format!(
            "volume name {name:?} must be a single path component"
        ))),
    }
}

/// `remove_dir_all` that treats an already-missing directory as removed.
async fn remove_dir_all_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// `create_dir_all` with an explicit permission mode for new directories.
async fn create_dir_all_with_mode(path: &Path, mode: u32) -> io::Result<()> {
    tokio::fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .await
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`Mounter`] used by the backend tests.

    use std::collections::HashSet;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::mount::Mounter;

    /// Records mounts in a set instead of touching the kernel.
    #[derive(Default)]
    pub struct FakeMounter {
        mounted: Mutex<HashSet<PathBuf>>,
        calls: Mutex<Vec<(PathBuf, PathBuf, Vec<String>)>>,
        fail_mount: AtomicBool,
        fail_unmount: AtomicBool,
        fail_is_mount_point: AtomicBool,
    }

    impl FakeMounter {
        pub fn fail_mounts(&self, fail: bool) {
            self.fail_mount.store(fail, Ordering::SeqCst);
        }

        pub fn fail_unmounts(&self, fail: bool) {
            self.fail_unmount.store(fail, Ordering::SeqCst);
        }

        pub fn fail_mount_point_checks(&self, fail: bool) {
            self.fail_is_mount_point.store(fail, Ordering::SeqCst);
        }

        pub fn is_mounted(&self, target: &Path) -> bool {
            self.mounted.lock().unwrap().contains(target)
        }

        pub fn mount_calls(&self) -> Vec<(PathBuf, PathBuf, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mounter for FakeMounter {
        async fn mount(
            &self,
            source: &Path,
            target: &Path,
            _fs_type: &str,
            options: &[String],
        ) -> io::Result<()> {
            if self.fail_mount.load(Ordering::SeqCst) {
                return Err(io::Error::other("mount: permission denied"));
            }
            self.calls.lock().unwrap().push((
                source.to_path_buf(),
                target.to_path_buf(),
                options.to_vec(),
            ));
            self.mounted.lock().unwrap().insert(target.to_path_buf());
            Ok(())
        }

        async fn unmount(&self, target: &Path) -> io::Result<()> {
            if self.fail_unmount.load(Ordering::SeqCst) {
                return Err(io::Error::other("umount: target is busy"));
            }
            self.mounted.lock().unwrap().remove(target);
            Ok(())
        }

        async fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
            if self.fail_is_mount_point.load(Ordering::SeqCst) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "/proc/self/mounts: permission denied",
                ));
            }
            if !path.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                ));
            }
            Ok(self.is_mounted(path))
        }
    }

    /// Driver over a fresh registry rooted in `dir`, with both roots created.
    pub fn make_driver(
        dir: &Path,
        mounter: std::sync::Arc<FakeMounter>,
    ) -> super::HostPathDriver {
        let config = super::DriverConfig {
            node_id: "test-node".to_owned(),
            volume_root: dir.join("csi"),
            data_dir: dir.join("data"),
            ..Default::default()
        };
        std::fs::create_dir_all(&config.volume_root).unwrap();
        std::fs::create_dir_all(&config.data_dir).unwrap();
        super::HostPathDriver::new(
            config,
            std::sync::Arc::new(crate::registry::VolumeRegistry::new()),
            mounter,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_names_are_single_components() {
        assert!(validate_volume_name("pvc-123").is_ok());
        assert!(matches!(
            validate_volume_name(""),
            Err(CsiError::InvalidArgument(_))
        ));
        assert!(validate_volume_name("../etc").is_err());
        assert!(validate_volume_name("a/b").is_err());
        assert!(validate_volume_name("/abs").is_err());
        assert!(validate_volume_name("..").is_err());
    }

    #[test]
    fn default_config_uses_well_known_paths() {
        let config = DriverConfig::default();
        assert_eq!(config.driver_name, DEFAULT_DRIVER_NAME);
        assert_eq!(config.volume_root, Path::new(DEFAULT_VOLUME_ROOT));
        assert_eq!(config.data_dir, Path::new(DEFAULT_DATA_DIR));
        assert!(!config.strict_publish);
        assert!(!config.node_id.is_empty());
    }

    #[tokio::test]
    async fn remove_missing_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        remove_dir_all_if_exists(&tmp.path().join("gone"))
            .await
            .unwrap();
    }
}
