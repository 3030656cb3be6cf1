//! Capacity probing
//!
//! Three layers, top-down:
//! 1. [`CapacityScheduler`] walks a [`ProbePlan`]: doubling addresses from
//!    1 MiB, then bisecting towards the reported size.
//! 2. [`run_probe`] performs one read-verify-write-verify-restore cycle at
//!    a single address and checks the aliasing shadow of that address.
//! 3. Each cycle is made of [`BlockTransport`](crate::device::BlockTransport)
//!    transactions.
//!
//! Probing is strictly sequential. A probe always finishes its restore
//! before the next one starts.

mod outcome;
mod pattern;
mod schedule;
mod scheduler;
mod transaction;

pub use outcome::{ByteMismatch, ProbeOutcome, ShadowCorruption};
pub use pattern::test_pattern;
pub use schedule::{Phase, ProbePlan, ProbeStep};
pub use scheduler::{CapacityScheduler, ProbeSummary};
pub use transaction::{run_probe, ProbeRequest};
