//! BlockTransport to gpt_disk_io::BlockIo adapter
//!
//! Lets the GPT readers from `gpt_disk_io` decode on-disk structures through
//! the same one-transaction-per-transfer path the probing engine uses, at
//! whatever sector size is being tried.

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

use super::BlockTransport;
use crate::error::DeviceError;

/// Wrapper around a [`BlockTransport`] implementing `gpt_disk_io::BlockIo`
pub struct TransportBlockIo<T> {
    transport: T,
    block_size: BlockSize,
    total_size: u64,
}

impl<T: BlockTransport> TransportBlockIo<T> {
    /// View `transport` as `block_size`-byte blocks over `total_size` bytes
    pub fn new(transport: T, block_size: BlockSize, total_size: u64) -> Self {
        Self {
            transport,
            block_size,
            total_size,
        }
    }

    fn offset(&self, lba: Lba) -> u64 {
        lba.0.saturating_mul(self.block_size.to_u64())
    }
}

impl<T: BlockTransport> BlockIo for TransportBlockIo<T> {
    type Error = DeviceError;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.total_size / self.block_size.to_u64())
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.offset(start_lba);
        self.transport.read_at(offset, dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let offset = self.offset(start_lba);
        self.transport.write_at(offset, src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Every transfer is already flushed before it returns
        Ok(())
    }
}
