//! Size and sector-size queries (`BLKGETSIZE64`, `BLKSSZGET`)

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use super::raw::close_checked;
use crate::error::DeviceError;

const BLOCK_IOCTL_TYPE: u64 = 0x12;

/// `_IO(0x12, 104)`: logical sector size as an `int`
const BLKSSZGET: u64 = (BLOCK_IOCTL_TYPE << 8) | 104;

/// `_IOR(0x12, 114, size_t)`: device size in bytes as a `u64`
const BLKGETSIZE64: u64 = ioc_read(BLOCK_IOCTL_TYPE, 114, core::mem::size_of::<usize>() as u64);

/// asm-generic encoding of `_IOR`
const fn ioc_read(ty: u64, nr: u64, size: u64) -> u64 {
    const IOC_READ: u64 = 2;
    (IOC_READ << 30) | (size << 16) | (ty << 8) | nr
}

/// What the kernel reports about a block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Total size in bytes
    pub total_size: u64,
    /// Logical sector size in bytes
    pub block_size: usize,
}

/// Ask the kernel for the size and sector size of the device at `path`
pub fn query_geometry(path: &Path) -> Result<Geometry, DeviceError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(path)
        .map_err(|e| DeviceError::from_open(path, e))?;
    let fd = file.as_raw_fd();

    let mut total_size: u64 = 0;
    // SAFETY: BLKGETSIZE64 writes a single u64 through the pointer, which
    // points at a live local.
    let res = unsafe { libc::ioctl(fd, BLKGETSIZE64 as _, &mut total_size as *mut u64) };
    if res < 0 {
        return Err(DeviceError::from_ioctl(
            path,
            "BLKGETSIZE64",
            io::Error::last_os_error(),
        ));
    }

    let mut block_size: libc::c_int = 0;
    // SAFETY: BLKSSZGET writes a single int through the pointer.
    let res = unsafe { libc::ioctl(fd, BLKSSZGET as _, &mut block_size as *mut libc::c_int) };
    if res < 0 {
        return Err(DeviceError::from_ioctl(
            path,
            "BLKSSZGET",
            io::Error::last_os_error(),
        ));
    }

    close_checked(path, file)?;

    Ok(Geometry {
        total_size,
        block_size: block_size.max(0) as usize,
    })
}
