//! Runs a probe plan against a device

use tracing::info;

use super::schedule::{Phase, ProbePlan, ProbeStep};
use super::transaction::run_probe;
use crate::config::DeviceConfig;
use crate::device::BlockTransport;
use crate::error::{Error, Result};

/// What a clean run covered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    pub exponential_probes: usize,
    pub bisection_probes: usize,
    /// Highest probe address, zero when the device is below the floor
    pub highest_verified: u64,
}

impl ProbeSummary {
    pub fn probes(&self) -> usize {
        self.exponential_probes + self.bisection_probes
    }

    fn record(&mut self, step: &ProbeStep) {
        match step.phase {
            Phase::Exponential => self.exponential_probes += 1,
            Phase::Bisection => self.bisection_probes += 1,
        }
        self.highest_verified = self.highest_verified.max(step.request.address);
    }
}

/// Drives probes one at a time and stops at the first bad one
pub struct CapacityScheduler<'a, T: ?Sized> {
    device: &'a mut T,
    config: &'a DeviceConfig,
}

impl<'a, T: BlockTransport + ?Sized> CapacityScheduler<'a, T> {
    pub fn new(device: &'a mut T, config: &'a DeviceConfig) -> Self {
        Self { device, config }
    }

    /// Probe every planned address.
    ///
    /// Returns the summary when the reported capacity could not be
    /// disproved. The first transport error or dirty probe ends the run;
    /// a dirty probe comes back as [`Error::ProbeFailed`] whether it marks
    /// the real end of the storage or corruption inside it.
    pub fn run(&mut self) -> Result<ProbeSummary> {
        let block_size = self.config.block_size();
        let mut summary = ProbeSummary::default();

        for step in ProbePlan::for_device(self.config) {
            info!(
                phase = ?step.phase,
                address = step.request.address,
                modulus = step.request.modulus,
                sequence = step.request.sequence,
                "probing"
            );

            let outcome = run_probe(&mut *self.device, block_size, step.request)?;
            if !outcome.is_clean() {
                return Err(Error::ProbeFailed(Box::new(outcome)));
            }
            summary.record(&step);
        }

        info!(
            probes = summary.probes(),
            highest = summary.highest_verified,
            "reported capacity not disproved"
        );
        Ok(summary)
    }
}
