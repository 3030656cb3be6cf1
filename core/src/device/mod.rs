//! Device I/O transactions
//!
//! Every access to the device under test is one complete transaction:
//! open, seek, a single transfer, flush, close. [`BlockTransport`] is the
//! seam between the probing engine and the medium; [`RawDevice`] is the
//! real implementation and the tests substitute simulated devices.

mod geometry;
mod gpt_io;
mod raw;

pub use geometry::{query_geometry, Geometry};
pub use gpt_io::TransportBlockIo;
pub use raw::RawDevice;

use crate::error::DeviceError;

/// One-shot positioned transfers against a block device
pub trait BlockTransport {
    /// Fill `buf` entirely from `offset`
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// Commit all of `buf` at `offset` to stable storage
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError>;
}

impl<T: BlockTransport + ?Sized> BlockTransport for &mut T {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        (**self).read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        (**self).write_at(offset, buf)
    }
}
