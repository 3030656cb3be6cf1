//! disksize - check the real capacity of a raw block device
//!
//! Reports what the kernel and the partition table say about the device,
//! refuses to run on a device with a mounted partition, and after two
//! confirmations walks the device with write/read-back probes to find out
//! whether it really stores as much as it claims.
//!
//! # Usage
//!
//! ```bash
//! sudo disksize /dev/sdb
//!
//! # show every transaction
//! sudo RUST_LOG=debug disksize /dev/sdb
//! ```
//!
//! Exit status is 0 for a clean pass or when the operator declines, 255
//! for any fatal error or failed probe, and `EPERM` when not run as root.

mod confirm;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use disksize_core::config::looks_like_device;
use disksize_core::device::{query_geometry, RawDevice};
use disksize_core::disk::{scan_partitions, PartitionScan};
use disksize_core::human::human_size;
use disksize_core::mounts::check_mounts;
use disksize_core::{CapacityScheduler, DeviceConfig, Error};

use confirm::confirm;

/// Exit status of every fatal error
const EXIT_FATAL: u8 = 255;

/// Exit status when not run as root
const EXIT_NOT_ROOT: u8 = libc::EPERM as u8;

#[derive(Parser, Debug)]
#[command(name = "disksize", version)]
#[command(about = "Check whether a raw block device really holds the capacity it reports")]
struct Args {
    /// Absolute path of the raw block device, e.g. /dev/sdb
    device: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    // SAFETY: geteuid has no preconditions and cannot fail.
    let euid = unsafe { libc::geteuid() };
    if let Some(status) = privilege_status(euid) {
        println!("You must be root to run this");
        return ExitCode::from(status);
    }

    let args = Args::parse();
    init_tracing();

    let result = run(&args.device);
    if let Err(e) = &result {
        report_failure(e);
    }
    ExitCode::from(exit_status(&result))
}

/// Exit status to stop with before doing anything, `None` for root
fn privilege_status(euid: libc::uid_t) -> Option<u8> {
    (euid != 0).then_some(EXIT_NOT_ROOT)
}

/// Exit status for the outcome of [`run`].
///
/// Declining a prompt and finding the device mounted are clean exits.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => EXIT_FATAL,
    }
}

fn report_failure(e: &anyhow::Error) {
    match e.downcast_ref::<Error>() {
        Some(Error::ProbeFailed(outcome)) => {
            println!("{outcome}");
            error!(address = outcome.address, "device failed verification");
        }
        // core messages already carry the platform error text
        Some(core) => {
            println!("{core}");
            error!("capacity check aborted");
        }
        None => {
            println!("{e:#}");
            error!("capacity check aborted");
        }
    }
}

fn run(path: &Path) -> Result<()> {
    if !looks_like_device(path) {
        bail!("{} does not look like a raw block device", path.display());
    }

    let geometry = query_geometry(path)?;
    println!(
        "{} reports its total size as {} bytes{}",
        path.display(),
        geometry.total_size,
        human_size(geometry.total_size)
    );
    println!(
        "{} reports its sector size as {} bytes{}",
        path.display(),
        geometry.block_size,
        human_size(geometry.block_size as u64)
    );

    let config = DeviceConfig::new(path, geometry.block_size, geometry.total_size)?;
    let mut device = RawDevice::new(path);

    report_partitions(&mut device, &config)?;

    if let Some(mount) = check_mounts(path)? {
        println!("Read/write size test cannot safely be done because");
        println!("{} has a mounted partition", path.display());
        info!(%mount, "device in use");
        return Ok(());
    }

    println!("The read/write size test will check the real amount of storage");
    println!("on the device. It tries not to corrupt the data on the device");
    println!("but this cannot be guaranteed. It should only be run when");
    println!("you suspect that the reported size of a new device is wrong.");
    if !confirm("Do you want to do a read/write size test (Y/N)?")? {
        return Ok(());
    }
    if !confirm("Are you sure?")? {
        return Ok(());
    }

    let summary = CapacityScheduler::new(&mut device, &config).run()?;
    if summary.probes() == 0 {
        println!("{} is too small to test", path.display());
    } else {
        println!(
            "{} probes up to address {} found no problems",
            summary.probes(),
            summary.highest_verified
        );
    }
    Ok(())
}

fn report_partitions(device: &mut RawDevice, config: &DeviceConfig) -> Result<()> {
    let path = config.path().display();
    match scan_partitions(device, config)? {
        PartitionScan::NotGpt => {}
        PartitionScan::HeaderNotFound => {
            println!("{path} appears to have GPT partitioning");
            println!("Could not find GPT header on {path}");
        }
        PartitionScan::Gpt(report) => {
            println!("{path} appears to have GPT partitioning");
            print!("{report}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::anyhow;
    use disksize_core::{DeviceError, ProbeOutcome};

    #[test]
    fn only_root_may_run() {
        assert_eq!(privilege_status(0), None);
        assert_eq!(privilege_status(1000), Some(libc::EPERM as u8));
    }

    #[test]
    fn clean_or_declined_run_exits_zero() {
        assert_eq!(exit_status(&Ok(())), 0);
    }

    #[test]
    fn failed_verification_is_fatal() {
        const GIB: u64 = 1024 * 1024 * 1024;
        let mut outcome = ProbeOutcome::new(2 * GIB - 512, GIB - 512);
        outcome.corruptions = 512;
        let result: Result<()> = Err(Error::ProbeFailed(Box::new(outcome)).into());
        assert_eq!(exit_status(&result), 255);
    }

    #[test]
    fn transport_error_is_fatal() {
        let short = DeviceError::ShortRead {
            path: PathBuf::from("/dev/sdz"),
            offset: 4096,
            len: 512,
            actual: 0,
        };
        let result: Result<()> = Err(Error::Device(short).into());
        assert_eq!(exit_status(&result), 255);
    }

    #[test]
    fn front_end_error_is_fatal() {
        let result: Result<()> = Err(anyhow!("sdz does not look like a raw block device"));
        assert_eq!(exit_status(&result), 255);
    }
}
