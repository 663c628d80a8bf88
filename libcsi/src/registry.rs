//! In-memory volume registry.
//!
//! [`VolumeRegistry`] is the single source of truth for every volume this
//! plugin has provisioned.  It is an explicitly owned object: the binary
//! constructs one at start-up and hands it to the driver behind an [`Arc`].
//! Nothing is persisted, so the registry lives exactly as long as the process.
//!
//! Two lock scopes are independent of each other:
//!
//! * the registry map itself ([`DashMap`]) protects insert / lookup / delete /
//!   iterate, and its shard locks are never held across an `.await`;
//! * every [`VolumeRecord`] carries its own async mutex protecting the
//!   multi-field lifecycle state.
//!
//! [`VolumeLocks`] adds a third, optional scope used by node operations: an
//! operation lock per volume id that survives a record being replaced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tracing::debug;

use crate::error::CsiError;
use crate::types::{VolumeId, VolumeState};

// ---------------------------------------------------------------------------
// Volume record
// ---------------------------------------------------------------------------

/// Mutable lifecycle state of one volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeStatus {
    /// Set by a successful controller attach, cleared by detach.
    pub attached: bool,
    /// Node-local staging path; `None` when not staged.
    pub stage_path: Option<PathBuf>,
    /// Target path currently bind-mounted; `None` when not published.
    pub publish_path: Option<PathBuf>,
    /// Node that most recently published the volume.
    pub publish_node: Option<String>,
}

impl VolumeStatus {
    /// The lifecycle phase this status corresponds to.
    pub fn state(&self) -> VolumeState {
        if self.publish_path.is_some() {
            VolumeState::Published
        } else if self.stage_path.is_some() {
            VolumeState::Staged
        } else if self.attached {
            VolumeState::Attached
        } else {
            VolumeState::Created
        }
    }
}

/// One registry entry: the backing directory plus the locked lifecycle state.
#[derive(Debug)]
pub struct VolumeRecord {
    path: PathBuf,
    status: Mutex<VolumeStatus>,
}

impl VolumeRecord {
    /// A freshly created, detached volume backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_status(path, VolumeStatus::default())
    }

    /// A record starting from an explicit status.
    pub fn with_status(path: impl Into<PathBuf>, status: VolumeStatus) -> Self {
        Self {
            path: path.into(),
            status: Mutex::new(status),
        }
    }

    /// Directory holding the volume's data.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the record lock for reading or mutating the status.
    pub async fn lock(&self) -> MutexGuard<'_, VolumeStatus> {
        self.status.lock().await
    }

    /// Copy of the current status, taken under the record lock.
    pub async fn snapshot(&self) -> VolumeStatus {
        self.status.lock().await.clone()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Concurrency-safe map from volume id to volume record.
#[derive(Debug, Default)]
pub struct VolumeRegistry {
    volumes: DashMap<VolumeId, Arc<VolumeRecord>>,
}

impl VolumeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` under `id` and return a handle to it.
    ///
    /// An existing entry with the same id is replaced; handles to the old
    /// record stay valid but no longer describe the registered volume.
    pub fn create(&self, id: VolumeId, record: VolumeRecord) -> Arc<VolumeRecord> {
        let record = Arc::new(record);
        if let Some(previous) = self.volumes.insert(id.clone(), Arc::clone(&record)) {
            debug!(
                volume_id = %id,
                previous_path = %previous.path().display(),
                "registry entry replaced",
            );
        }
        record
    }

    /// Look up a volume, failing with [`CsiError::VolumeNotFound`].
    pub fn get(&self, id: &VolumeId) -> Result<Arc<VolumeRecord>, CsiError> {
        self.lookup(id)
            .ok_or_else(|| CsiError::VolumeNotFound(id.to_string()))
    }

    /// Look up a volume, returning `None` when it is absent.
    pub fn lookup(&self, id: &VolumeId) -> Option<Arc<VolumeRecord>> {
        self.volumes.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a volume.  Removing an absent id is a no-op.
    pub fn delete(&self, id: &VolumeId) -> Option<Arc<VolumeRecord>> {
        let removed = self.volumes.remove(id).map(|(_, record)| record);
        if removed.is_none() {
            debug!(volume_id = %id, "delete of unknown volume ignored");
        }
        removed
    }

    /// Snapshot up to `max_entries` entries (`0` means all).
    ///
    /// Iteration order is unspecified.  The returned handles are collected
    /// before any record lock is taken, so callers may lock records freely.
    pub fn enumerate(&self, max_entries: usize) -> Vec<(VolumeId, Arc<VolumeRecord>)> {
        let limit = if max_entries == 0 {
            usize::MAX
        } else {
            max_entries
        };
        self.volumes
            .iter()
            .take(limit)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &VolumeId) -> bool {
        self.volumes.contains_key(id)
    }

    /// Number of registered volumes.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether the registry holds no volumes.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Per-volume operation locks
// ---------------------------------------------------------------------------

/// Operation locks keyed by volume id.
///
/// Node operations on the same volume are serialized while operations on
/// different volumes proceed in parallel.  The lock is keyed by id rather
/// than stored in the record because `NodePublishVolume` may replace the
/// record while holding it.
#[derive(Debug, Default)]
pub struct VolumeLocks {
    locks: DashMap<VolumeId, Arc<Mutex<()>>>,
}

impl VolumeLocks {
    /// An empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    ///
    /// The slot is pruned when the returned guard drops and nobody else
    /// holds or waits on it, so ids that are never seen again leave nothing
    /// behind.
    pub async fn acquire(&self, id: &VolumeId) -> VolumeLockGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(id.clone()).or_default());
        VolumeLockGuard {
            locks: self,
            id: id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drop the lock for `id` if nobody holds or waits on it.
    pub fn prune(&self, id: &VolumeId) {
        self.locks
            .remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of lock slots currently allocated.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock slots are allocated.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one volume id, released (and pruned) on drop.
#[derive(Debug)]
pub struct VolumeLockGuard<'a> {
    locks: &'a VolumeLocks,
    id: VolumeId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for VolumeLockGuard<'_> {
    fn drop(&mut self) {
        // Release before pruning, otherwise our own clone keeps the slot alive.
        drop(self.guard.take());
        self.locks.prune(&self.id);
    }
}
