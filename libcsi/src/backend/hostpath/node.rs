use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{HostPathDriver, create_dir_all_with_mode, remove_dir_all_if_exists};
use crate::error::CsiError;
use crate::node::CsiNode;
use crate::registry::{VolumeRecord, VolumeStatus};
use crate::types::*;

impl HostPathDriver {
    /// Prepare the record a publish call mounts from.
    ///
    /// By default publish implies stage: the volume is (re)registered as
    /// attached and staged at its own directory, whatever state it was in.
    /// With `strict_publish` the volume must already be attached and staged.
    async fn record_for_publish(
        &self,
        volume_id: &VolumeId,
    ) -> Result<Arc<VolumeRecord>, CsiError> {
        if self.config.strict_publish {
            let record = self.registry.get(volume_id)?;
            {
                let status = record.lock().await;
                if !status.attached {
                    return Err(CsiError::VolumeNotAttached(volume_id.to_string()));
                }
                if status.stage_path.is_none() {
                    return Err(CsiError::VolumeNotStaged(volume_id.to_string()));
                }
            }
            ensure_backing_dir(record.path()).await?;
            return Ok(record);
        }

        let path = match self.registry.lookup(volume_id) {
            Some(existing) => existing.path().to_path_buf(),
            None => self.data_path(volume_id),
        };
        ensure_backing_dir(&path).await?;

        let status = VolumeStatus {
            attached: true,
            stage_path: Some(path.clone()),
            ..Default::default()
        };
        Ok(self
            .registry
            .create(volume_id.clone(), VolumeRecord::with_status(path, status)))
    }
}

async fn ensure_backing_dir(path: &Path) -> Result<(), CsiError> {
    create_dir_all_with_mode(path, 0o755)
        .await
        .map_err(|e| CsiError::BackendError(format!("create dir {}: {e}", path.display())))
}

#[async_trait]
impl CsiNode for HostPathDriver {
    #[instrument(skip(self, req), fields(volume_id = %req.volume_id))]
    async fn stage_volume(&self, req: NodeStageVolumeRequest) -> Result<(), CsiError> {
        if req.staging_target_path.is_empty() {
            return Err(CsiError::InvalidArgument(
                "staging target path must not be empty".into(),
            ));
        }

        let _guard = self.locks.acquire(&req.volume_id).await;
        let record = self.registry.get(&req.volume_id)?;
        let mut status = record.lock().await;

        if !status.attached {
            return Err(CsiError::VolumeNotAttached(req.volume_id.to_string()));
        }
        if status.stage_path.is_some() {
            return Err(CsiError::VolumeAlreadyStaged(req.volume_id.to_string()));
        }
        status.stage_path = Some(PathBuf::from(&req.staging_target_path));

        info!(path = %req.staging_target_path, "volume staged");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unstage_volume(
        &self,
        volume_id: &VolumeId,
        staging_target_path: &str,
    ) -> Result<(), CsiError> {
        let _guard = self.locks.acquire(volume_id).await;
        let Some(record) = self.registry.lookup(volume_id) else {
            debug!(%volume_id, "volume unknown, nothing to unstage");
            return Ok(());
        };

        record.lock().await.stage_path = None;
        info!(%volume_id, "volume unstaged");
        Ok(())
    }

    #[instrument(skip(self, req), fields(volume_id = %req.volume_id, target_path = %req.target_path))]
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError> {
        let access_type = req
            .volume_capability
            .as_ref()
            .and_then(|cap| cap.access_type.as_ref());
        let (fs_type, mount_flags) = match access_type {
            Some(AccessType::Mount {
                fs_type,
                mount_flags,
            }) => (fs_type.as_str(), mount_flags.as_slice()),
            Some(AccessType::Block) => return Err(CsiError::unimplemented("block access type")),
            Some(AccessType::Unknown) | None => {
                return Err(CsiError::InvalidArgument("unknown access type".into()));
            }
        };
        if req.target_path.is_empty() {
            return Err(CsiError::InvalidArgument(
                "target path must not be empty".into(),
            ));
        }

        let _guard = self.locks.acquire(&req.volume_id).await;
        let record = self.record_for_publish(&req.volume_id).await?;

        let target = Path::new(&req.target_path);
        let mounted = match self.mounter.is_mount_point(target).await {
            Ok(mounted) => mounted,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                create_dir_all_with_mode(target, 0o750)
                    .await
                    .map_err(|e| CsiError::MountFailed {
                        path: req.target_path.clone(),
                        reason: format!("create target dir: {e}"),
                    })?;
                false
            }
            Err(e) => {
                return Err(CsiError::MountFailed {
                    path: req.target_path.clone(),
                    reason: format!("check mount point: {e}"),
                });
            }
        };

        if mounted {
            debug!("target already mounted, assuming idempotent retry");
        } else {
            let mut options = mount_flags.to_vec();
            options.push("bind".to_owned());
            if req.readonly {
                options.push("ro".to_owned());
            }
            self.mounter
                .mount(record.path(), target, fs_type, &options)
                .await
                .map_err(|e| CsiError::MountFailed {
                    path: req.target_path.clone(),
                    reason: e.to_string(),
                })?;
            info!(
                source = %record.path().display(),
                readonly = req.readonly,
                "volume published (bind-mount)",
            );
        }

        let mut status = record.lock().await;
        status.publish_path = Some(target.to_path_buf());
        status.publish_node = Some(self.config.node_id.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unpublish_volume(
        &self,
        volume_id: &VolumeId,
        target_path: &str,
    ) -> Result<(), CsiError> {
        let _guard = self.locks.acquire(volume_id).await;
        let record = self.registry.get(volume_id)?;
        let mut status = record.lock().await;

        let target = Path::new(target_path);
        if status.publish_path.as_deref() != Some(target) {
            debug!(
                recorded = ?status.publish_path,
                "target not the recorded publish path, nothing to unpublish",
            );
            return Ok(());
        }

        let mounted =
            self.mounter
                .is_mount_point(target)
                .await
                .map_err(|e| CsiError::UnmountFailed {
                    path: target_path.to_owned(),
                    reason: format!("check mount point: {e}"),
                })?;
        if mounted {
            self.mounter
                .unmount(target)
                .await
                .map_err(|e| CsiError::UnmountFailed {
                    path: target_path.to_owned(),
                    reason: e.to_string(),
                })?;
        }

        remove_dir_all_if_exists(target)
            .await
            .map_err(|e| CsiError::UnmountFailed {
                path: target_path.to_owned(),
                reason: format!("remove target dir: {e}"),
            })?;
        remove_dir_all_if_exists(record.path())
            .await
            .map_err(|e| {
                CsiError::BackendError(format!("remove dir {}: {e}", record.path().display()))
            })?;

        status.publish_path = None;
        status.publish_node = None;

        info!(%volume_id, %target_path, "volume unpublished");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_volume_stats(
        &self,
        volume_id: &VolumeId,
        volume_path: &str,
    ) -> Result<VolumeStats, CsiError> {
        let _guard = self.locks.acquire(volume_id).await;
        self.registry.get(volume_id)?;
        Ok(VolumeStats {
            condition: VolumeCondition {
                abnormal: false,
                message: String::new(),
            },
        })
    }

    async fn get_capabilities(&self) -> Result<Vec<NodeCapability>, CsiError> {
        Ok(vec![
            NodeCapability::StageUnstageVolume,
            NodeCapability::VolumeCondition,
            NodeCapability::GetVolumeStats,
            NodeCapability::SingleNodeMultiWriter,
        ])
    }

    async fn get_info(&self) -> Result<NodeInfo, CsiError> {
        Ok(NodeInfo {
            node_id: self.config.node_id.clone(),
            max_volumes: 0,
            accessible_topology: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::testing::{FakeMounter, make_driver};
    use super::*;
    use crate::controller::CsiController;
    use crate::error::ErrorCode;

    async fn create(driver: &HostPathDriver, name: &str) -> VolumeId {
        driver
            .create_volume(CreateVolumeRequest {
                name: name.into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .volume_id
    }

    async fn attach(driver: &HostPathDriver, volume_id: &VolumeId) {
        driver
            .controller_publish_volume(ControllerPublishVolumeRequest {
                volume_id: volume_id.clone(),
                node_id: "test-node".into(),
                volume_capability: None,
                readonly: false,
                volume_context: HashMap::new(),
            })
            .await
            .unwrap();
    }

    fn stage_req(volume_id: &VolumeId, path: &Path) -> NodeStageVolumeRequest {
        NodeStageVolumeRequest {
            volume_id: volume_id.clone(),
            staging_target_path: path.to_string_lossy().into_owned(),
            volume_capability: Some(VolumeCapability::default()),
            volume_context: HashMap::new(),
        }
    }

    fn publish_req(volume_id: &VolumeId, target: &Path) -> NodePublishVolumeRequest {
        NodePublishVolumeRequest {
            volume_id: volume_id.clone(),
            staging_target_path: String::new(),
            target_path: target.to_string_lossy().into_owned(),
            volume_capability: Some(VolumeCapability::mount("", vec!["noatime".into()])),
            readonly: false,
            volume_context: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn stage_requires_attach_and_happens_once() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));
        let id = create(&driver, "v1").await;
        let staging = tmp.path().join("staging");

        let err = driver.stage_volume(stage_req(&id, &staging)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FailedPrecondition);

        attach(&driver, &id).await;
        driver.stage_volume(stage_req(&id, &staging)).await.unwrap();

        let err = driver.stage_volume(stage_req(&id, &staging)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);

        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.stage_path.as_deref(), Some(staging.as_path()));
    }

    #[tokio::test]
    async fn stage_unknown_volume_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));

        let err = driver
            .stage_volume(stage_req(&VolumeId::from("nope"), Path::new("/stage")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn empty_paths_are_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));
        let id = create(&driver, "v1").await;
        attach(&driver, &id).await;

        let err = driver
            .stage_volume(stage_req(&id, Path::new("")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let err = driver
            .publish_volume(publish_req(&id, Path::new("")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert!(status.stage_path.is_none());
        assert!(status.publish_path.is_none());
    }

    #[tokio::test]
    async fn unstage_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));
        let id = create(&driver, "v1").await;
        attach(&driver, &id).await;
        driver
            .stage_volume(stage_req(&id, &tmp.path().join("staging")))
            .await
            .unwrap();

        driver.unstage_volume(&id, "").await.unwrap();
        driver.unstage_volume(&id, "").await.unwrap();
        driver
            .unstage_volume(&VolumeId::from("nope"), "")
            .await
            .unwrap();

        // Unstaged volumes may be staged again.
        driver
            .stage_volume(stage_req(&id, &tmp.path().join("staging")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_bind_mounts_backing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("pods/p1/mount");

        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        assert!(target.is_dir());
        assert!(mounter.is_mounted(&target));
        let calls = mounter.mount_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, tmp.path().join("csi/v1"));
        assert_eq!(calls[0].2, vec!["noatime".to_owned(), "bind".to_owned()]);

        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert!(status.attached);
        assert_eq!(status.stage_path.as_deref(), Some(tmp.path().join("csi/v1").as_path()));
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));
        assert_eq!(status.publish_node.as_deref(), Some("test-node"));
    }

    #[tokio::test]
    async fn publish_unknown_volume_uses_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = VolumeId::from("pre-provisioned");
        let target = tmp.path().join("target");

        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        let data = tmp.path().join("data/pre-provisioned");
        assert!(data.is_dir());
        assert_eq!(driver.registry().get(&id).unwrap().path(), data.as_path());
        assert_eq!(mounter.mount_calls()[0].0, data);
    }

    #[tokio::test]
    async fn publish_is_idempotent_on_mounted_target() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");

        driver.publish_volume(publish_req(&id, &target)).await.unwrap();
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        assert_eq!(mounter.mount_calls().len(), 1);
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));
    }

    #[tokio::test]
    async fn publish_readonly_adds_ro_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;

        let mut req = publish_req(&id, &tmp.path().join("target"));
        req.readonly = true;
        driver.publish_volume(req).await.unwrap();

        assert!(mounter.mount_calls()[0].2.contains(&"ro".to_owned()));
    }

    #[tokio::test]
    async fn publish_rejects_unsupported_access_types() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));
        let id = VolumeId::from("v1");
        let target = tmp.path().join("target");

        let mut req = publish_req(&id, &target);
        req.volume_capability = Some(VolumeCapability {
            access_mode: AccessMode::SingleNodeWriter,
            access_type: Some(AccessType::Block),
        });
        let err = driver.publish_volume(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unimplemented);

        let mut req = publish_req(&id, &target);
        req.volume_capability = Some(VolumeCapability {
            access_mode: AccessMode::SingleNodeWriter,
            access_type: Some(AccessType::Unknown),
        });
        let err = driver.publish_volume(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let mut req = publish_req(&id, &target);
        req.volume_capability = None;
        let err = driver.publish_volume(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        // Nothing was registered or created for rejected requests.
        assert!(driver.registry().is_empty());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn publish_mount_failure_is_internal() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        mounter.fail_mounts(true);
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;

        let err = driver
            .publish_volume(publish_req(&id, &tmp.path().join("target")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);

        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert!(status.publish_path.is_none());
    }

    #[tokio::test]
    async fn strict_publish_requires_staged_volume() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let mut driver = make_driver(tmp.path(), Arc::clone(&mounter));
        driver.config.strict_publish = true;
        let target = tmp.path().join("target");

        let err = driver
            .publish_volume(publish_req(&VolumeId::from("nope"), &target))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let id = create(&driver, "v1").await;
        let err = driver.publish_volume(publish_req(&id, &target)).await.unwrap_err();
        assert!(matches!(err, CsiError::VolumeNotAttached(_)));

        attach(&driver, &id).await;
        let err = driver.publish_volume(publish_req(&id, &target)).await.unwrap_err();
        assert!(matches!(err, CsiError::VolumeNotStaged(_)));
        assert_eq!(err.code(), ErrorCode::FailedPrecondition);

        let staging = tmp.path().join("staging");
        driver.stage_volume(stage_req(&id, &staging)).await.unwrap();
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        // The staged record is kept rather than replaced.
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.stage_path.as_deref(), Some(staging.as_path()));
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));
    }

    #[tokio::test]
    async fn unpublish_mismatched_target_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        let other = tmp.path().join("other");
        driver
            .unpublish_volume(&id, &other.to_string_lossy())
            .await
            .unwrap();

        assert!(mounter.is_mounted(&target));
        assert!(target.is_dir());
        assert!(tmp.path().join("csi/v1").is_dir());
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));
    }

    #[tokio::test]
    async fn unpublish_unmounts_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        let target_str = target.to_string_lossy().into_owned();
        driver.unpublish_volume(&id, &target_str).await.unwrap();

        assert!(!mounter.is_mounted(&target));
        assert!(!target.exists());
        assert!(!tmp.path().join("csi/v1").exists());
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert!(status.publish_path.is_none());
        assert!(status.publish_node.is_none());

        // A retry finds nothing recorded and succeeds.
        driver.unpublish_volume(&id, &target_str).await.unwrap();
    }

    #[tokio::test]
    async fn publish_mount_point_check_failure_is_internal() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");

        mounter.fail_mount_point_checks(true);
        let err = driver.publish_volume(publish_req(&id, &target)).await.unwrap_err();
        assert!(matches!(err, CsiError::MountFailed { .. }));
        assert_eq!(err.code(), ErrorCode::Internal);

        assert!(mounter.mount_calls().is_empty());
        assert!(!target.exists());
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert!(status.publish_path.is_none());
    }

    #[tokio::test]
    async fn unpublish_mount_point_check_failure_keeps_publication() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        mounter.fail_mount_point_checks(true);
        let err = driver
            .unpublish_volume(&id, &target.to_string_lossy())
            .await
            .unwrap_err();
        assert!(matches!(err, CsiError::UnmountFailed { .. }));
        assert_eq!(err.code(), ErrorCode::Internal);

        assert!(mounter.is_mounted(&target));
        assert!(tmp.path().join("csi/v1").is_dir());
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));
    }

    #[tokio::test]
    async fn unpublish_unmount_failure_is_retryable() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));
        let id = create(&driver, "v1").await;
        let target = tmp.path().join("target");
        let target_str = target.to_string_lossy().into_owned();
        driver.publish_volume(publish_req(&id, &target)).await.unwrap();

        mounter.fail_unmounts(true);
        let err = driver.unpublish_volume(&id, &target_str).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(mounter.is_mounted(&target));
        assert!(target.is_dir());
        let status = driver.registry().get(&id).unwrap().snapshot().await;
        assert_eq!(status.publish_path.as_deref(), Some(target.as_path()));

        mounter.fail_unmounts(false);
        driver.unpublish_volume(&id, &target_str).await.unwrap();
        assert!(!mounter.is_mounted(&target));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn lock_slots_released_for_unknown_ids_and_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let mounter = Arc::new(FakeMounter::default());
        let driver = make_driver(tmp.path(), Arc::clone(&mounter));

        for i in 0..50 {
            let ghost = VolumeId(format!("ghost-{i}"));
            driver.delete_volume(&ghost).await.unwrap();
            driver.unstage_volume(&ghost, "").await.unwrap();
            assert!(driver.get_volume_stats(&ghost, "").await.is_err());
            assert!(driver.unpublish_volume(&ghost, "/target").await.is_err());
            assert!(
                driver
                    .stage_volume(stage_req(&ghost, Path::new("/stage")))
                    .await
                    .is_err()
            );
        }

        mounter.fail_mounts(true);
        let id = create(&driver, "v1").await;
        assert!(
            driver
                .publish_volume(publish_req(&id, &tmp.path().join("target")))
                .await
                .is_err()
        );

        assert!(driver.locks.is_empty());
        assert_eq!(driver.registry().len(), 1);
    }

    #[tokio::test]
    async fn unpublish_unknown_volume_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));

        let err = driver
            .unpublish_volume(&VolumeId::from("nope"), "/target")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn volume_stats_and_info() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = make_driver(tmp.path(), Arc::new(FakeMounter::default()));
        let id = create(&driver, "v1").await;

        let stats = driver.get_volume_stats(&id, "").await.unwrap();
        assert!(!stats.condition.abnormal);

        let err = driver
            .get_volume_stats(&VolumeId::from("nope"), "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        assert_eq!(driver.get_info().await.unwrap().node_id, "test-node");
        assert_eq!(driver.get_capabilities().await.unwrap().len(), 4);
        assert_eq!(
            driver.expand_volume(&id, "", 1).await.unwrap_err().code(),
            ErrorCode::Unimplemented
        );
    }
}
