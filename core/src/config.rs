//! Device context and engine constants

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Smallest sector size in use; the MBR is always read with this size
pub const MIN_BLOCK_SIZE: usize = 512;

/// Largest sector size in use
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Lowest probe address (1 MiB)
pub const PROBE_FLOOR: u64 = 1024 * 1024;

/// Bisection stops once the remaining interval is no wider than this (1 MiB)
pub const BISECT_RESOLUTION: u64 = 1024 * 1024;

/// Diagnostic lines printed per probe for each kind of failure
pub const DIAGNOSTIC_LIMIT: usize = 9;

/// Raw block devices live here
pub const DEVICE_PREFIX: &str = "/dev/";

/// The device under test, as discovered before probing starts.
///
/// Replaces process-wide state: every transaction and the scheduler get
/// their device path and sector size from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    path: PathBuf,
    block_size: usize,
    total_size: u64,
}

impl DeviceConfig {
    pub fn new(path: impl Into<PathBuf>, block_size: usize, total_size: u64) -> Result<Self> {
        if block_size == 0 || block_size > MAX_BLOCK_SIZE || !block_size.is_power_of_two() {
            return Err(Error::UnsupportedBlockSize(block_size));
        }

        Ok(Self {
            path: path.into(),
            block_size,
            total_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sector size in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Size the device claims, in bytes
    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}

/// Check that `path` names something under `/dev/`
pub fn looks_like_device(path: &Path) -> bool {
    path.to_str()
        .map(|p| p.starts_with(DEVICE_PREFIX))
        .unwrap_or(false)
}
