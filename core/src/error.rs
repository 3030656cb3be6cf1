//! Error types for capacity checking
//!
//! Transport failures live in [`DeviceError`]; everything the engine can
//! report is wrapped by [`Error`]. Nothing in this crate exits the process:
//! the binary decides what a given error means for the exit status.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::probe::ProbeOutcome;

/// Result type for capacity-check operations
pub type Result<T> = core::result::Result<T, Error>;

/// Coarse classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Nothing is connected at the path, or the path does not exist
    Absent,
    /// The caller may not open the device
    PermissionDenied,
    /// A seek landed somewhere other than the requested offset
    Misplaced,
    /// Fewer bytes were transferred than requested
    ShortTransfer,
    /// Any other platform error
    Io,
}

/// Failure of a single device transaction
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Open failed with ENODEV, ENXIO or ENOMEDIUM
    #[error("No device connected at {}", path.display())]
    NoDevice { path: PathBuf },

    #[error("{} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("You aren't allowed to open {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Error opening {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("seek to address {offset} on {} failed: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        source: io::Error,
    },

    #[error("Seek to {requested} on {} went to {actual} instead", path.display())]
    SeekMismatch {
        path: PathBuf,
        requested: u64,
        actual: u64,
    },

    #[error("Reading {len} bytes at offset {offset} from {} failed: {source}", path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        len: usize,
        source: io::Error,
    },

    #[error(
        "Reading {len} bytes at offset {offset} from {} read {actual} bytes instead",
        path.display()
    )]
    ShortRead {
        path: PathBuf,
        offset: u64,
        len: usize,
        actual: usize,
    },

    #[error("Writing {len} bytes at offset {offset} to {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        offset: u64,
        len: usize,
        source: io::Error,
    },

    #[error(
        "Writing {len} bytes at offset {offset} to {} wrote {actual} bytes instead",
        path.display()
    )]
    ShortWrite {
        path: PathBuf,
        offset: u64,
        len: usize,
        actual: usize,
    },

    #[error("Error fsync'ing {}: {source}", path.display())]
    Sync { path: PathBuf, source: io::Error },

    #[error("Error closing {}: {source}", path.display())]
    Close { path: PathBuf, source: io::Error },

    /// Size ioctl rejected with ENOTBLK, ENOTSUP, ENOTTY or EOPNOTSUPP
    #[error("{} does not seem to be a block device", path.display())]
    NotBlockDevice { path: PathBuf },

    #[error("ioctl({request}) on {}: {source}", path.display())]
    Ioctl {
        path: PathBuf,
        request: &'static str,
        source: io::Error,
    },
}

impl DeviceError {
    /// Classify a failed `open(2)` on `path`
    pub fn from_open(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.raw_os_error() {
            Some(libc::ENODEV) | Some(libc::ENXIO) | Some(libc::ENOMEDIUM) => {
                Self::NoDevice { path }
            }
            Some(libc::ENOENT) => Self::NotFound { path },
            Some(libc::EPERM) | Some(libc::EACCES) => Self::PermissionDenied { path },
            _ => Self::Open { path, source },
        }
    }

    /// Classify a failed block-device ioctl on `path`
    pub fn from_ioctl(path: &Path, request: &'static str, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.raw_os_error() {
            Some(code)
                if code == libc::ENOTBLK
                    || code == libc::ENOTSUP
                    || code == libc::ENOTTY
                    || code == libc::EOPNOTSUPP =>
            {
                Self::NotBlockDevice { path }
            }
            _ => Self::Ioctl {
                path,
                request,
                source,
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoDevice { .. } | Self::NotFound { .. } => FailureKind::Absent,
            Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
            Self::SeekMismatch { .. } => FailureKind::Misplaced,
            Self::ShortRead { .. } | Self::ShortWrite { .. } => FailureKind::ShortTransfer,
            _ => FailureKind::Io,
        }
    }
}

/// Errors reported by the capacity-check engine
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("unsupported sector size {0} (must be a power of two no larger than {max})", max = crate::config::MAX_BLOCK_SIZE)]
    UnsupportedBlockSize(usize),

    /// A probe request that would break the probe preconditions
    #[error("cannot probe address {address} with modulus {modulus}: {reason}")]
    InvalidProbe {
        address: u64,
        modulus: u64,
        reason: &'static str,
    },

    /// Read-back mismatch or shadow corruption. A capacity boundary and
    /// corruption inside the claimed range look the same from here.
    #[error("{0}")]
    ProbeFailed(Box<ProbeOutcome>),

    #[error("partition table on {}: {message}", path.display())]
    Partition { path: PathBuf, message: String },

    #[error("{operation} /proc/mounts: {source}")]
    Mounts {
        operation: &'static str,
        source: io::Error,
    },
}

impl Error {
    /// The transport classification, when this is a transport failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Device(e) => Some(e.kind()),
            _ => None,
        }
    }
}
