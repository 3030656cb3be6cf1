//! Choice of probe addresses
//!
//! Phase 1 doubles the address from [`PROBE_FLOOR`] while it stays within
//! the reported size, checking each address against half of itself: a
//! device that ignores its top address bit folds `2^k` onto `2^(k-1)`.
//! Phase 2 bisects between the last phase 1 address and the reported
//! size, keeping that address as the modulus, until the gap is no wider
//! than [`BISECT_RESOLUTION`].
//!
//! The plan does not depend on probe results: any failed probe ends the
//! run, so a plan is just a sequence of addresses.

use super::transaction::ProbeRequest;
use crate::config::{DeviceConfig, BISECT_RESOLUTION, PROBE_FLOOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Doubling from the floor
    Exponential,
    /// Halving the gap to the reported size
    Bisection,
}

/// One scheduled probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStep {
    pub phase: Phase,
    pub request: ProbeRequest,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Exponential { next: u64, last: Option<u64> },
    Bisection { lower: u64, modulus: u64 },
    Done,
}

/// Iterator over the probes for a device
#[derive(Debug, Clone)]
pub struct ProbePlan {
    total_size: u64,
    block_size: u64,
    sequence: u64,
    state: State,
}

impl ProbePlan {
    pub fn new(total_size: u64, block_size: usize) -> Self {
        Self {
            total_size,
            block_size: block_size as u64,
            sequence: 0,
            state: State::Exponential {
                next: PROBE_FLOOR,
                last: None,
            },
        }
    }

    pub fn for_device(config: &DeviceConfig) -> Self {
        Self::new(config.total_size(), config.block_size())
    }

    fn step(&mut self, phase: Phase, address: u64, modulus: u64) -> ProbeStep {
        let sequence = self.sequence;
        self.sequence += 1;
        ProbeStep {
            phase,
            request: ProbeRequest {
                address,
                modulus,
                sequence,
            },
        }
    }

    /// Next state once doubling has passed the reported size
    fn after_exponential(&self, last: Option<u64>) -> State {
        match last {
            Some(last) if last != self.total_size => State::Bisection {
                lower: last,
                modulus: last,
            },
            _ => State::Done,
        }
    }
}

impl Iterator for ProbePlan {
    type Item = ProbeStep;

    fn next(&mut self) -> Option<ProbeStep> {
        loop {
            match self.state {
                State::Exponential { next, last } => {
                    if next > self.total_size {
                        self.state = self.after_exponential(last);
                        continue;
                    }

                    self.state = match next.checked_mul(2) {
                        Some(doubled) => State::Exponential {
                            next: doubled,
                            last: Some(next),
                        },
                        None => self.after_exponential(Some(next)),
                    };
                    return Some(self.step(Phase::Exponential, next, next / 2));
                }
                State::Bisection { lower, modulus } => {
                    let gap = self.total_size - lower;
                    if gap <= BISECT_RESOLUTION {
                        self.state = State::Done;
                        return None;
                    }

                    let midpoint = lower + gap / 2;
                    let address = midpoint - midpoint % self.block_size;
                    if address <= lower {
                        self.state = State::Done;
                        return None;
                    }

                    self.state = State::Bisection {
                        lower: address,
                        modulus,
                    };
                    return Some(self.step(Phase::Bisection, address, modulus));
                }
                State::Done => return None,
            }
        }
    }
}
