// Partition information

use gpt_disk_types::{guid, GptPartitionEntry, GptPartitionType};

/// One used entry of a GPT partition table, in bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartitionExtent {
    pub index: u32,
    pub partition_type: PartitionType,
    pub start: u64,
    pub end: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartitionType {
    EfiSystem,
    LinuxFilesystem,
    LinuxSwap,
    BasicData,
    Unknown,
}

impl PartitionExtent {
    pub fn from_entry(index: u32, entry: &GptPartitionEntry, block_size: u64) -> Self {
        Self {
            index,
            partition_type: PartitionType::from_gpt_guid(&{ entry.partition_type_guid }),
            start: entry.starting_lba.to_u64().saturating_mul(block_size),
            end: entry.ending_lba.to_u64().saturating_mul(block_size),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.partition_type {
            PartitionType::EfiSystem => "EFI System",
            PartitionType::LinuxFilesystem => "Linux FS",
            PartitionType::LinuxSwap => "Linux Swap",
            PartitionType::BasicData => "Basic Data",
            PartitionType::Unknown => "Unknown",
        }
    }
}

impl PartitionType {
    /// Convert from gpt_disk_types GUID to PartitionType
    pub fn from_gpt_guid(guid: &GptPartitionType) -> Self {
        let linux_fs = GptPartitionType(guid!("0fc63daf-8483-4772-8e79-3d69d8477de4"));
        let linux_swap = GptPartitionType(guid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f"));

        if guid == &GptPartitionType::EFI_SYSTEM {
            PartitionType::EfiSystem
        } else if guid == &GptPartitionType::BASIC_DATA {
            PartitionType::BasicData
        } else if guid == &linux_fs {
            PartitionType::LinuxFilesystem
        } else if guid == &linux_swap {
            PartitionType::LinuxSwap
        } else {
            PartitionType::Unknown
        }
    }
}
