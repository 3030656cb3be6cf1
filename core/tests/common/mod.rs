//! Common test utilities and simulated block devices

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use disksize_core::device::{BlockTransport, TransportBlockIo};
use disksize_core::DeviceError;
use gpt_disk_io::Disk;
use gpt_disk_types::{
    guid, BlockSize, GptHeader, GptPartitionEntry, GptPartitionEntryArray, GptPartitionType, LbaLe,
    U32Le,
};

pub const MIB: u64 = 1024 * 1024;
pub const GIB: u64 = 1024 * MIB;

/// Storage granularity of the simulated devices
pub const GRANULE: u64 = 512;

/// A transfer seen by a simulated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u64),
    Write(u64),
}

impl Op {
    pub fn offset(&self) -> u64 {
        match *self {
            Op::Read(o) | Op::Write(o) => o,
        }
    }
}

/// Sparse in-memory device with optional misbehaviour.
///
/// Unwritten cells hold a fixed, address-dependent filler so that
/// restoring "original data" is observable.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub path: PathBuf,
    pub size: u64,
    cells: HashMap<u64, Vec<u8>>,
    /// Addresses at or above this fold onto `address % alias`
    alias: Option<u64>,
    /// Writes at or above this are silently dropped
    drop_writes_from: Option<u64>,
    short_reads_from: Option<u64>,
    short_writes_from: Option<u64>,
    /// Index into `ops` of a transfer that fails with EIO
    fail_op: Option<usize>,
    pub ops: Vec<Op>,
}

impl SimDevice {
    /// Device that stores every byte faithfully
    pub fn perfect(size: u64) -> Self {
        Self {
            path: PathBuf::from("/dev/sim0"),
            size,
            cells: HashMap::new(),
            alias: None,
            drop_writes_from: None,
            short_reads_from: None,
            short_writes_from: None,
            fail_op: None,
            ops: Vec::new(),
        }
    }

    /// Device whose real storage stops at `real`; everything above wraps
    pub fn aliased(size: u64, real: u64) -> Self {
        Self {
            alias: Some(real),
            ..Self::perfect(size)
        }
    }

    pub fn dropping_writes_from(mut self, address: u64) -> Self {
        self.drop_writes_from = Some(address);
        self
    }

    pub fn short_reads_from(mut self, address: u64) -> Self {
        self.short_reads_from = Some(address);
        self
    }

    pub fn short_writes_from(mut self, address: u64) -> Self {
        self.short_writes_from = Some(address);
        self
    }

    pub fn failing_op(mut self, index: usize) -> Self {
        self.fail_op = Some(index);
        self
    }

    fn physical(&self, address: u64) -> u64 {
        match self.alias {
            Some(real) if address >= real => address % real,
            _ => address,
        }
    }

    fn filler(cell: u64) -> Vec<u8> {
        (0..GRANULE)
            .map(|i| ((cell.wrapping_mul(7) + i * 13) % 251) as u8)
            .collect()
    }

    fn cell(&self, address: u64) -> Vec<u8> {
        let cell = self.physical(address) / GRANULE;
        self.cells
            .get(&cell)
            .cloned()
            .unwrap_or_else(|| Self::filler(cell))
    }

    /// Current content, bypassing fault injection and the op log
    pub fn peek(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        let mut address = offset;
        while out.len() < len {
            out.extend_from_slice(&self.cell(address));
            address += GRANULE;
        }
        out.truncate(len);
        out
    }

    fn injected_failure(&self) -> Option<io::Error> {
        if self.fail_op == Some(self.ops.len() - 1) {
            Some(io::Error::from_raw_os_error(libc::EIO))
        } else {
            None
        }
    }

    fn in_range(&self, offset: u64, len: usize) -> usize {
        self.size.saturating_sub(offset).min(len as u64) as usize
    }
}

impl BlockTransport for SimDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.ops.push(Op::Read(offset));
        if let Some(source) = self.injected_failure() {
            return Err(DeviceError::Read {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                source,
            });
        }

        let mut actual = self.in_range(offset, buf.len());
        if matches!(self.short_reads_from, Some(from) if offset >= from) {
            actual = buf.len() / 2;
        }
        if actual != buf.len() {
            return Err(DeviceError::ShortRead {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                actual,
            });
        }

        buf.copy_from_slice(&self.peek(offset, buf.len()));
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DeviceError> {
        self.ops.push(Op::Write(offset));
        if let Some(source) = self.injected_failure() {
            return Err(DeviceError::Write {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                source,
            });
        }

        let mut actual = self.in_range(offset, buf.len());
        if matches!(self.short_writes_from, Some(from) if offset >= from) {
            actual = buf.len() / 2;
        }
        if actual != buf.len() {
            return Err(DeviceError::ShortWrite {
                path: self.path.clone(),
                offset,
                len: buf.len(),
                actual,
            });
        }

        if matches!(self.drop_writes_from, Some(from) if offset >= from) {
            return Ok(());
        }

        for (i, chunk) in buf.chunks(GRANULE as usize).enumerate() {
            let address = offset + i as u64 * GRANULE;
            let cell = self.physical(address) / GRANULE;
            let mut data = self.cell(address);
            data[..chunk.len()].copy_from_slice(chunk);
            self.cells.insert(cell, data);
        }
        Ok(())
    }
}

/// Write a protective MBR and both GPT copies with one EFI System
/// partition covering LBAs 2048..=4095, using `block_size` sectors
pub fn write_test_gpt(device: &mut SimDevice, block_size: BlockSize) {
    let bs = block_size.to_u64();
    let num_blocks = device.size / bs;
    // 128 entries of 128 bytes
    let entry_bytes = 128 * 128;
    let entry_blocks = entry_bytes as u64 / bs;

    let io = TransportBlockIo::new(&mut *device, block_size, num_blocks * bs);
    let mut disk = Disk::new(io).expect("disk handle");
    let mut block = vec![0u8; bs as usize];

    let mut header = GptHeader {
        my_lba: LbaLe::from_u64(1),
        alternate_lba: LbaLe::from_u64(num_blocks - 1),
        first_usable_lba: LbaLe::from_u64(2 + entry_blocks),
        last_usable_lba: LbaLe::from_u64(num_blocks - 2 - entry_blocks),
        disk_guid: guid!("12345678-1234-1234-1234-123456789012"),
        partition_entry_lba: LbaLe::from_u64(2),
        number_of_partition_entries: U32Le::from_u32(128),
        ..Default::default()
    };

    disk.write_protective_mbr(&mut block)
        .expect("protective mbr");

    let layout = header
        .get_partition_entry_array_layout()
        .expect("entry layout");
    let mut entry_buf = vec![0u8; entry_bytes];
    let mut entries = GptPartitionEntryArray::new(layout, block_size, &mut entry_buf)
        .expect("entry array");
    *entries.get_partition_entry_mut(0).expect("slot 0") = GptPartitionEntry {
        partition_type_guid: GptPartitionType::EFI_SYSTEM,
        unique_partition_guid: guid!("12345678-1234-5678-1234-567812345678"),
        starting_lba: LbaLe::from_u64(2048),
        ending_lba: LbaLe::from_u64(4095),
        ..Default::default()
    };

    header.partition_entry_array_crc32 = entries.calculate_crc32();
    header.update_header_crc32();
    disk.write_primary_gpt_header(&header, &mut block)
        .expect("primary header");
    disk.write_gpt_partition_entry_array(&entries)
        .expect("primary entries");

    let mut secondary = header.clone();
    secondary.my_lba = header.alternate_lba;
    secondary.alternate_lba = header.my_lba;
    secondary.partition_entry_lba = LbaLe::from_u64(num_blocks - 1 - entry_blocks);
    secondary.update_header_crc32();
    disk.write_secondary_gpt_header(&secondary, &mut block)
        .expect("secondary header");

    let secondary_layout = secondary
        .get_partition_entry_array_layout()
        .expect("secondary layout");
    let mut secondary_buf = entries.storage().to_vec();
    let secondary_entries =
        GptPartitionEntryArray::new(secondary_layout, block_size, &mut secondary_buf)
            .expect("secondary entries");
    disk.write_gpt_partition_entry_array(&secondary_entries)
        .expect("secondary entries written");
}
