//! Filesystem usage probing for the local store directory.
//!
//! A [`DiskStatus`] is computed fresh from `statvfs(2)` on every call. Nothing
//! is cached, so callers always see the current state of the filesystem that
//! contains the probed path.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Disk usage of the filesystem containing a path, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskStatus {
    total: u64,
    used: u64,
    free: u64,
}

impl DiskStatus {
    /// Build a status from the total and free byte counts.
    ///
    /// `used` is always derived as `total - free`, never sampled separately.
    pub fn new(total: u64, free: u64) -> Self {
        let free = free.min(total);
        Self {
            total,
            used: total - free,
            free,
        }
    }

    /// Build a status from raw block counts as reported by `statvfs(2)`.
    pub fn from_blocks(blocks: u64, free_blocks: u64, block_size: u64) -> Self {
        Self::new(
            blocks.saturating_mul(block_size),
            free_blocks.saturating_mul(block_size),
        )
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn free(&self) -> u64 {
        self.free
    }

    /// Percentage of the filesystem in use, `used / total * 100`.
    ///
    /// A filesystem reporting zero total bytes is treated as empty.
    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64) * 100.0
    }
}

impl Serialize for DiskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DiskStatus", 4)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("used", &self.used)?;
        state.serialize_field("free", &self.free)?;
        state.serialize_field("used_percent", &self.used_percent())?;
        state.end()
    }
}

/// Errors raised while probing disk usage.
#[derive(Error, Debug)]
pub enum DiskUsageError {
    /// The filesystem statistics query failed (missing path, permissions, OS error).
    #[error("failed to query filesystem statistics for '{}': {source}", .path.display())]
    Statvfs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Disk usage probing is not available on this platform.
    #[error("disk usage probing is not supported on this platform")]
    Unsupported,
}

/// Source of disk usage figures for a path.
///
/// [`FilesystemProbe`] queries the operating system. Any
/// `Fn(&Path) -> Result<DiskStatus, DiskUsageError>` closure is also a provider,
/// which lets tests feed fixed figures.
pub trait DiskUsageProvider: Send + Sync {
    fn disk_usage(&self, path: &Path) -> Result<DiskStatus, DiskUsageError>;
}

impl<F> DiskUsageProvider for F
where
    F: Fn(&Path) -> Result<DiskStatus, DiskUsageError> + Send + Sync,
{
    fn disk_usage(&self, path: &Path) -> Result<DiskStatus, DiskUsageError> {
        self(path)
    }
}

/// Disk usage provider backed by `statvfs(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemProbe;

impl DiskUsageProvider for FilesystemProbe {
    fn disk_usage(&self, path: &Path) -> Result<DiskStatus, DiskUsageError> {
        disk_usage(path)
    }
}

/// Query the disk usage of the filesystem containing `path`.
#[cfg(unix)]
pub fn disk_usage(path: &Path) -> Result<DiskStatus, DiskUsageError> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| DiskUsageError::Statvfs {
        path: path.to_path_buf(),
        source: std::io::Error::from(errno),
    })?;

    Ok(DiskStatus::from_blocks(
        u64::from(stat.blocks()),
        u64::from(stat.blocks_free()),
        u64::from(stat.fragment_size()),
    ))
}

/// Query the disk usage of the filesystem containing `path`.
#[cfg(not(unix))]
pub fn disk_usage(_path: &Path) -> Result<DiskStatus, DiskUsageError> {
    Err(DiskUsageError::Unsupported)
}
