//! Disksize Core Library
//!
//! Checks whether a raw block device really stores as much data as it
//! claims. Counterfeit flash media often report a large size while only a
//! fraction of the addresses reach real, independent cells; beyond that,
//! writes fail, come back wrong, or land on top of other data.
//!
//! # Layers
//!
//! 1. [`device`] - one open/seek/transfer/flush/close transaction per call
//! 2. [`probe`] - the read-verify-write-verify-restore cycle at one
//!    address, and the schedule of addresses (doubling, then bisection)
//! 3. [`disk`], [`mounts`], [`human`] - reporting and safety checks run
//!    before any destructive probe
//!
//! # Usage
//!
//! ```ignore
//! use disksize_core::{device, CapacityScheduler, DeviceConfig};
//!
//! let geometry = device::query_geometry(path)?;
//! let config = DeviceConfig::new(path, geometry.block_size, geometry.total_size)?;
//! let mut raw = device::RawDevice::new(path);
//! let summary = CapacityScheduler::new(&mut raw, &config).run()?;
//! ```

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod device;
pub mod disk;
pub mod error;
pub mod human;
pub mod mounts;
pub mod probe;

pub use config::DeviceConfig;
pub use error::{DeviceError, Error, FailureKind, Result};
pub use probe::{CapacityScheduler, ProbeOutcome, ProbeSummary};
