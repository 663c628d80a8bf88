//! Mount capability used by the node service.
//!
//! The node service never calls `mount(2)` directly; it goes through the
//! [`Mounter`] trait so that the lifecycle logic can be exercised without
//! privileges.  [`SystemMounter`] is the production implementation built on
//! [`nix::mount`].

use std::io;
use std::path::Path;

use async_trait::async_trait;
use nix::mount::MsFlags;
use tracing::debug;

/// Bind-mount / unmount / mount-point detection.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount `source` onto `target`.
    ///
    /// `options` uses the `mount(8)` option vocabulary (`"bind"`, `"ro"`,
    /// `"noatime"`, ...).
    async fn mount(
        &self,
        source: &Path,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> io::Result<()>;

    /// Unmount whatever is mounted at `target`.
    async fn unmount(&self, target: &Path) -> io::Result<()>;

    /// Whether `path` is currently a mount point.
    ///
    /// Fails with [`io::ErrorKind::NotFound`] when `path` does not exist.
    async fn is_mount_point(&self, path: &Path) -> io::Result<bool>;
}

/// [`Mounter`] backed by the host kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl SystemMounter {
    /// Create a new system mounter.
    pub fn new() -> Self {
        Self
    }
}

/// Split `mount(8)` style options into kernel flags and the remaining
/// filesystem-specific data string.
fn parse_options(options: &[String]) -> (MsFlags, Option<String>) {
    let mut flags = MsFlags::empty();
    let mut data = Vec::new();
    for opt in options {
        match opt.as_str() {
            "bind" => flags |= MsFlags::MS_BIND,
            "ro" => flags |= MsFlags::MS_RDONLY,
            "nosuid" => flags |= MsFlags::MS_NOSUID,
            "nodev" => flags |= MsFlags::MS_NODEV,
            "noexec" => flags |= MsFlags::MS_NOEXEC,
            "noatime" => flags |= MsFlags::MS_NOATIME,
            "nodiratime" => flags |= MsFlags::MS_NODIRATIME,
            "relatime" => flags |= MsFlags::MS_RELATIME,
            "sync" => flags |= MsFlags::MS_SYNCHRONOUS,
            "remount" => flags |= MsFlags::MS_REMOUNT,
            "rw" | "defaults" | "" => {}
            other => data.push(other),
        }
    }
    let data = (!data.is_empty()).then(|| data.join(","));
    (flags, data)
}

/// Decode the octal escapes used by `/proc/self/mounts` (`\040` for space,
/// `\011` tab, `\012` newline, `\134` backslash).
fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

/// Whether `path` appears as a mount point in a `/proc/self/mounts` listing.
fn listed_as_mount_point(mounts: &str, path: &Path) -> bool {
    // Format: <device> <mountpoint> <fstype> <options> <dump> <pass>
    mounts.lines().any(|line| {
        line.split_whitespace()
            .nth(1)
            .is_some_and(|mp| Path::new(&unescape_mount_path(mp)) == path)
    })
}

#[async_trait]
impl Mounter for SystemMounter {
    async fn mount(
        &self,
        source: &Path,
        target: &Path,
        fs_type: &str,
        options: &[String],
    ) -> io::Result<()> {
        let (flags, data) = parse_options(options);
        let fstype = (!fs_type.is_empty()).then_some(fs_type);

        debug!(
            source = %source.display(),
            target = %target.display(),
            ?flags,
            "mount",
        );
        nix::mount::mount(Some(source), target, fstype, flags, data.as_deref())?;

        // The kernel ignores MS_RDONLY on the initial bind-mount call; a
        // separate remount is required to actually enforce read-only access.
        if flags.contains(MsFlags::MS_BIND | MsFlags::MS_RDONLY) {
            nix::mount::mount(
                None::<&str>,
                target,
                None::<&str>,
                MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
                None::<&str>,
            )?;
        }
        Ok(())
    }

    async fn unmount(&self, target: &Path) -> io::Result<()> {
        debug!(target = %target.display(), "umount");
        nix::mount::umount(target)?;
        Ok(())
    }

    async fn is_mount_point(&self, path: &Path) -> io::Result<bool> {
        // Surfaces NotFound for a missing path before consulting the table.
        tokio::fs::metadata(path).await?;
        let canonical = tokio::fs::canonicalize(path).await?;
        let mounts = tokio::fs::read_to_string("/proc/self/mounts").await?;
        Ok(listed_as_mount_point(&mounts, &canonical))
    }
}
