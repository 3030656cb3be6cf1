//! Refuse to touch a device with a mounted partition

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::{Error, Result};

pub const PROC_MOUNTS: &str = "/proc/mounts";

/// First line of a mount table that starts with `device`.
///
/// This is a plain prefix match, so `/dev/sdb` also matches `/dev/sdb1`:
/// any mounted partition of the device counts.
pub fn find_mount<R: BufRead>(device: &Path, mut table: R) -> Result<Option<String>> {
    let prefix = device.as_os_str().as_bytes();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = table.read_until(b'\n', &mut line).map_err(|source| Error::Mounts {
            operation: "Error reading",
            source,
        })?;
        if read == 0 {
            return Ok(None);
        }
        if line.starts_with(prefix) {
            return Ok(Some(String::from_utf8_lossy(&line).trim_end().to_string()));
        }
    }
}

/// Look `device` up in `/proc/mounts`
pub fn check_mounts(device: &Path) -> Result<Option<String>> {
    let file = File::open(PROC_MOUNTS).map_err(|source| Error::Mounts {
        operation: "cannot open",
        source,
    })?;
    find_mount(device, BufReader::new(file))
}
