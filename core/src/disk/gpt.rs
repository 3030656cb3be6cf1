//! GPT report for the device under test
//!
//! Purely diagnostic: shows the operator what the partition table believes
//! about the disk (where the backup header sits, how far the partitions
//! reach) before the capacity check starts. Nothing here changes the sector
//! size the probing engine uses.

use core::fmt;
use std::path::Path;

use gpt_disk_io::{Disk, DiskError};
use gpt_disk_types::{BlockSize, GptHeader, Lba};
use uguid::Guid;

use super::partition::PartitionExtent;
use crate::config::{DeviceConfig, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::device::{BlockTransport, TransportBlockIo};
use crate::error::{DeviceError, Error, Result};

/// Byte of the MBR holding the type of the first partition record
const MBR_FIRST_TYPE_OFFSET: usize = 446 + 4;

/// Partition type of a protective MBR
const PROTECTIVE_MBR_TYPE: u8 = 0xEE;

/// A partition table as one header describes it, addresses in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub address: u64,
    pub entry_count: u32,
    pub entry_size: u32,
    pub partitions: Vec<PartitionExtent>,
}

/// One GPT header, addresses in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderReport {
    pub own_address: u64,
    pub alternate_address: u64,
    pub first_usable: u64,
    pub last_usable: u64,
    pub disk_guid: Guid,
    pub table: TableReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupHeader {
    Valid(HeaderReport),
    InvalidSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptReport {
    /// Sector size at which the primary header was found
    pub block_size: u32,
    pub primary: HeaderReport,
    pub backup: BackupHeader,
}

/// What sector 0 and the GPT headers say about the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionScan {
    /// No protective MBR
    NotGpt,
    /// Protective MBR, but no GPT header at any supported sector size
    HeaderNotFound,
    Gpt(GptReport),
}

/// Read the MBR and, when it is protective, both GPT headers and tables
pub fn scan_partitions<T>(device: &mut T, config: &DeviceConfig) -> Result<PartitionScan>
where
    T: BlockTransport + ?Sized,
{
    let mut mbr = [0u8; MIN_BLOCK_SIZE];
    device.read_at(0, &mut mbr)?;
    if mbr[MBR_FIRST_TYPE_OFFSET] != PROTECTIVE_MBR_TYPE {
        return Ok(PartitionScan::NotGpt);
    }

    let mut size = MIN_BLOCK_SIZE;
    while size <= MAX_BLOCK_SIZE {
        let Some(block_size) = BlockSize::new(size as u32) else {
            break;
        };
        let io = TransportBlockIo::new(&mut *device, block_size, config.total_size());
        let mut disk = Disk::new(io).map_err(|e| gpt_error(config.path(), e))?;
        let mut block = vec![0u8; size];

        let header = disk
            .read_primary_gpt_header(&mut block)
            .map_err(|e| gpt_error(config.path(), e))?;
        if header.is_signature_valid() {
            return read_report(&mut disk, &header, size, config.path()).map(PartitionScan::Gpt);
        }
        size *= 2;
    }

    Ok(PartitionScan::HeaderNotFound)
}

fn read_report<T>(
    disk: &mut Disk<TransportBlockIo<T>>,
    primary: &GptHeader,
    block_size: usize,
    path: &Path,
) -> Result<GptReport>
where
    T: BlockTransport,
{
    let primary_report = read_header(disk, primary, block_size, path)?;

    let mut block = vec![0u8; block_size];
    let backup = disk
        .read_gpt_header(Lba(primary.alternate_lba.to_u64()), &mut block)
        .map_err(|e| gpt_error(path, e))?;
    let backup = if backup.is_signature_valid() {
        BackupHeader::Valid(read_header(disk, &backup, block_size, path)?)
    } else {
        BackupHeader::InvalidSignature
    };

    Ok(GptReport {
        block_size: block_size as u32,
        primary: primary_report,
        backup,
    })
}

fn read_header<T>(
    disk: &mut Disk<TransportBlockIo<T>>,
    header: &GptHeader,
    block_size: usize,
    path: &Path,
) -> Result<HeaderReport>
where
    T: BlockTransport,
{
    let bs = block_size as u64;
    let layout = header
        .get_partition_entry_array_layout()
        .map_err(|e| Error::Partition {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut block = vec![0u8; block_size];
    let mut partitions = Vec::new();
    let entries = disk
        .gpt_partition_entry_array_iter(layout, &mut block)
        .map_err(|e| gpt_error(path, e))?;
    for (index, entry) in entries.enumerate() {
        let entry = entry.map_err(|e| gpt_error(path, e))?;
        if entry.is_used() {
            partitions.push(PartitionExtent::from_entry(index as u32, &entry, bs));
        }
    }

    Ok(HeaderReport {
        own_address: header.my_lba.to_u64().saturating_mul(bs),
        alternate_address: header.alternate_lba.to_u64().saturating_mul(bs),
        first_usable: header.first_usable_lba.to_u64().saturating_mul(bs),
        last_usable: header.last_usable_lba.to_u64().saturating_mul(bs),
        disk_guid: header.disk_guid,
        table: TableReport {
            address: header.partition_entry_lba.to_u64().saturating_mul(bs),
            entry_count: header.number_of_partition_entries.to_u32(),
            entry_size: header.size_of_partition_entry.to_u32(),
            partitions,
        },
    })
}

fn gpt_error(path: &Path, error: DiskError<DeviceError>) -> Error {
    match error {
        DiskError::Io(e) => Error::Device(e),
        other => Error::Partition {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

impl fmt::Display for TableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self
            .address
            .saturating_add(u64::from(self.entry_count) * u64::from(self.entry_size));
        writeln!(
            f,
            "    {} partitions of size {} at {} to {}:",
            self.entry_count, self.entry_size, self.address, end
        )?;
        writeln!(f, "    (empty partitions omitted)")?;
        for p in &self.partitions {
            writeln!(f, "        from {} to {} ({})", p.start, p.end, p.type_name())?;
        }
        Ok(())
    }
}

impl fmt::Display for GptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primary = &self.primary;
        writeln!(f, "GPT header sector size is {}", self.block_size)?;
        writeln!(f, "GPT main header is at address {}", self.block_size)?;
        writeln!(f, "GPT disk GUID is {}", primary.disk_guid)?;
        writeln!(f, "GPT main header reports its own address as {}", primary.own_address)?;
        writeln!(f, "GPT main header reports first usable block as {}", primary.first_usable)?;
        writeln!(f, "GPT main header reports last usable block as {}", primary.last_usable)?;
        writeln!(f, "GPT main partition table:")?;
        write!(f, "{}", primary.table)?;
        writeln!(
            f,
            "GPT main header reports backup header address as {}",
            primary.alternate_address
        )?;

        match &self.backup {
            BackupHeader::InvalidSignature => {
                writeln!(f, "GPT backup header has an invalid signature")
            }
            BackupHeader::Valid(backup) => {
                writeln!(f, "GPT backup header reports its own address as {}", backup.own_address)?;
                writeln!(
                    f,
                    "GPT backup header reports main header address as {}",
                    backup.alternate_address
                )?;
                writeln!(f, "GPT backup header reports first usable block as {}", backup.first_usable)?;
                writeln!(f, "GPT backup header reports last usable block as {}", backup.last_usable)?;
                writeln!(f, "GPT backup partition table:")?;
                write!(f, "{}", backup.table)
            }
        }
    }
}
