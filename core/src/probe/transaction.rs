//! One read-verify-write-verify-restore cycle

use tracing::{debug, warn};

use super::outcome::{ByteMismatch, ProbeOutcome, ShadowCorruption};
use super::pattern::test_pattern;
use crate::device::BlockTransport;
use crate::error::{Error, Result};

/// Where and how to probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Upper end of the block under test; the block written is the one
    /// ending here
    pub address: u64,
    /// Span the device may be folding addresses into
    pub modulus: u64,
    /// Seed for the test pattern
    pub sequence: u64,
}

impl ProbeRequest {
    /// Start of the block under test, `None` when `address` is below one
    /// block
    pub fn target(&self, block_size: usize) -> Option<u64> {
        self.address.checked_sub(block_size as u64)
    }

    /// Start of the block the device might confuse with the target, `None`
    /// when there is no target or the modulus is zero
    pub fn shadow(&self, block_size: usize) -> Option<u64> {
        self.target(block_size)?.checked_rem(self.modulus)
    }

    /// Check the preconditions and return the target and shadow addresses
    fn validate(&self, block_size: usize) -> Result<(u64, u64)> {
        let bs = block_size as u64;
        let invalid = |reason| Error::InvalidProbe {
            address: self.address,
            modulus: self.modulus,
            reason,
        };

        if bs == 0 {
            return Err(invalid("sector size is zero"));
        }
        if self.address % bs != 0 || self.modulus % bs != 0 {
            return Err(invalid("not aligned to the sector size"));
        }
        let target = self
            .target(block_size)
            .filter(|&target| target >= bs)
            .ok_or_else(|| invalid("no block of headroom below the tested block"))?;
        let shadow = self
            .shadow(block_size)
            .ok_or_else(|| invalid("modulus is zero"))?;

        if shadow < target + bs && target < shadow + bs {
            return Err(invalid("shadow block overlaps the tested block"));
        }
        Ok((target, shadow))
    }
}

/// Probe one block and check its aliasing shadow.
///
/// The block ending at `request.address` is overwritten with a test pattern,
/// read back, and restored. The shadow block is read before the write,
/// while the pattern is live, and after the restore; any change there means
/// the write landed somewhere it should not have. If corruption is seen the
/// shadow's original bytes are written back on a best-effort basis.
///
/// Counts are returned even when non-zero; deciding that a dirty outcome is
/// fatal is the caller's job. Transport errors are returned as soon as they
/// happen, after a best-effort restore of the tested block if it had
/// already been overwritten.
pub fn run_probe<T>(device: &mut T, block_size: usize, request: ProbeRequest) -> Result<ProbeOutcome>
where
    T: BlockTransport + ?Sized,
{
    let (target, shadow) = request.validate(block_size)?;

    let mut before = vec![0u8; block_size];
    let mut original = vec![0u8; block_size];
    device.read_at(shadow, &mut before)?;
    device.read_at(target, &mut original)?;

    let pattern = test_pattern(request.sequence, block_size);
    let mut readback = vec![0u8; block_size];
    let mut live_shadow = vec![0u8; block_size];

    // From here on the tested block may hold the pattern; put the original
    // back before giving up on any failure
    let written = device
        .write_at(target, &pattern)
        .and_then(|()| device.read_at(target, &mut readback))
        .and_then(|()| device.read_at(shadow, &mut live_shadow));
    if let Err(e) = written {
        restore_best_effort(device, target, &original);
        return Err(e.into());
    }

    device.write_at(target, &original)?;

    let mut after = vec![0u8; block_size];
    device.read_at(shadow, &mut after)?;

    let mut outcome = ProbeOutcome::new(target, shadow);
    for n in 0..block_size {
        if readback[n] != pattern[n] {
            outcome.record_mismatch(ByteMismatch {
                address: target + n as u64,
                written: pattern[n],
                read: readback[n],
                original: original[n],
            });
        }
    }
    for n in 0..block_size {
        let changed = if live_shadow[n] != before[n] {
            live_shadow[n]
        } else {
            after[n]
        };
        if changed != before[n] {
            outcome.record_corruption(ShadowCorruption {
                written_at: target + n as u64,
                written: pattern[n],
                corrupted: shadow + n as u64,
                before: before[n],
                after: changed,
            });
        }
    }

    if outcome.corruptions > 0 {
        restore_best_effort(device, shadow, &before);
    }

    debug!(
        target,
        shadow,
        mismatches = outcome.mismatches,
        corruptions = outcome.corruptions,
        "probe complete"
    );
    Ok(outcome)
}

fn restore_best_effort<T>(device: &mut T, address: u64, data: &[u8])
where
    T: BlockTransport + ?Sized,
{
    if let Err(error) = device.write_at(address, data) {
        warn!(address, %error, "could not restore original data");
    }
}
