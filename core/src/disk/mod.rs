//! Partition table inspection

mod gpt;
mod partition;

pub use gpt::{scan_partitions, BackupHeader, GptReport, HeaderReport, PartitionScan, TableReport};
pub use partition::{PartitionExtent, PartitionType};
