//! Result of a single probe

use core::fmt;

use crate::config::DIAGNOSTIC_LIMIT;

/// A byte that did not read back as written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteMismatch {
    pub address: u64,
    pub written: u8,
    pub read: u8,
    pub original: u8,
}

/// A shadow byte that changed while a different address was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowCorruption {
    /// Byte of the tested block being written
    pub written_at: u64,
    pub written: u8,
    /// Shadow byte that changed
    pub corrupted: u64,
    pub before: u8,
    pub after: u8,
}

/// Mismatch and corruption counts for one probe, with the first few
/// occurrences of each kept for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Start of the block that was written
    pub address: u64,
    /// Start of the block checked for aliasing
    pub shadow: u64,
    pub mismatches: usize,
    pub corruptions: usize,
    pub mismatch_samples: Vec<ByteMismatch>,
    pub corruption_samples: Vec<ShadowCorruption>,
}

impl ProbeOutcome {
    pub fn new(address: u64, shadow: u64) -> Self {
        Self {
            address,
            shadow,
            mismatches: 0,
            corruptions: 0,
            mismatch_samples: Vec::new(),
            corruption_samples: Vec::new(),
        }
    }

    pub fn record_mismatch(&mut self, mismatch: ByteMismatch) {
        self.mismatches += 1;
        if self.mismatch_samples.len() < DIAGNOSTIC_LIMIT {
            self.mismatch_samples.push(mismatch);
        }
    }

    pub fn record_corruption(&mut self, corruption: ShadowCorruption) {
        self.corruptions += 1;
        if self.corruption_samples.len() < DIAGNOSTIC_LIMIT {
            self.corruption_samples.push(corruption);
        }
    }

    /// No mismatch and no corruption
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0 && self.corruptions == 0
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "address {} verified", self.address);
        }

        for m in &self.mismatch_samples {
            writeln!(
                f,
                "Wrote 0x{:X} at address {}, read back 0x{:X}, original data was 0x{:X}",
                m.written, m.address, m.read, m.original
            )?;
        }
        if self.mismatches > self.mismatch_samples.len() {
            writeln!(f, "...")?;
        }

        for c in &self.corruption_samples {
            writeln!(
                f,
                "Writing {:X} to address {} corrupted address {} from 0x{:X} to 0x{:X}",
                c.written, c.written_at, c.corrupted, c.before, c.after
            )?;
        }
        if self.corruptions > self.corruption_samples.len() {
            writeln!(f, "...")?;
        }

        write!(
            f,
            "{} mismatched and {} corrupted byte(s) probing address {} (shadow {})",
            self.mismatches, self.corruptions, self.address, self.shadow
        )
    }
}
