//! Transactions against a real device node

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::io::IntoRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::BlockTransport;
use crate::error::DeviceError;

/// A block device opened afresh for every transfer.
///
/// No descriptor is kept between calls, so a device that disappears
/// mid-run fails the next transaction instead of being written through a
/// stale handle.
#[derive(Debug, Clone)]
pub struct RawDevice {
    path: PathBuf,
}

impl RawDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<File, DeviceError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| DeviceError::from_open(&self.path, e))
    }

    fn seek(&self, file: &mut File, offset: u64) -> Result<(), DeviceError> {
        let actual = file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| DeviceError::Seek {
                path: self.path.clone(),
                offset,
                source,
            })?;

        if actual != offset {
            return Err(DeviceError::SeekMismatch {
                path: self.path.clone(),
                requested: offset,
                actual,
            });
        }
        Ok(())
    }

    /// Flush to stable storage and close, reporting failures of either
    fn finish(&self, file: File) -> Result<(), DeviceError> {
        file.sync_all().map_err(|source| DeviceError::Sync {
            path: self.path.clone(),
            source,
        })?;
        close_checked(&self.path, file)
    }
}

impl BlockTransport for RawDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let mut file = self.open()?;
        self.seek(&mut file, offset)?;

        let actual = file.read(buf).map_err(|source| DeviceError::Read {
            path: self.path.clone(),
            offset,
            len: buf.len(),
            source,
        })?;
        if actual != buf.len() {
            return Err(DeviceError::ShortRead {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                actual,
            });
        }

        self.finish(file)?;
        debug!(path = %self.path.display(), offset, len = buf.len(), "read");
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let mut file = self.open()?;
        self.seek(&mut file, offset)?;

        let actual = file.write(buf).map_err(|source| DeviceError::Write {
            path: self.path.clone(),
            offset,
            len: buf.len(),
            source,
        })?;
        if actual != buf.len() {
            return Err(DeviceError::ShortWrite {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                actual,
            });
        }

        self.finish(file)?;
        debug!(path = %self.path.display(), offset, len = buf.len(), "wrote");
        Ok(())
    }
}

/// Close `file` with `close(2)` so a failed close is not lost on drop
pub(super) fn close_checked(path: &Path, file: File) -> Result<(), DeviceError> {
    let fd = file.into_raw_fd();
    // SAFETY: fd was released from an owned File just above, so this is the
    // only close it will ever see.
    if unsafe { libc::close(fd) } != 0 {
        return Err(DeviceError::Close {
            path: path.to_path_buf(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
