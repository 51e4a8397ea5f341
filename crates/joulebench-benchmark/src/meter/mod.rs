//! Energy measurement around the timed part of a benchmark run.
//!
//! Callers only see [`EnergyMeter`]: `start` right before the first timed
//! query, `stop` right after the last one. The two adapters differ in how the
//! underlying backend hands back its numbers:
//!
//! - [`CumulativeMeter`] drives a [`CumulativeTracker`] that writes a single
//!   summary artifact on stop, which the meter reads and deletes.
//! - [`TraceMeter`] drives a [`TraceBackend`] that yields a list of timed
//!   samples, each with per-domain readings in their native units.

mod counter;
mod cumulative;
mod powercap;
mod rocm;
mod sampler;
mod trace;

pub use counter::{counter_delta, discover_rapl, EnergyCounter, RaplCounter, RaplDomain};
pub use cumulative::{ArtifactHandle, CumulativeMeter, CumulativeSummary, CumulativeTracker};
pub use powercap::PowercapTracker;
pub use rocm::{detect_rocm_gpus, RocmSmiCounter};
pub use sampler::TraceSampler;
pub use trace::{summarize, TraceBackend, TraceMeter};

use joulebench_core::{EnergyBackend, EnergyReport, Result};

pub trait EnergyMeter: Send {
    fn backend(&self) -> EnergyBackend;

    fn start(&mut self) -> Result<()>;

    /// Ends the measurement window. Never fails just because nothing was
    /// measured; an empty measurement is a zero report.
    fn stop(&mut self) -> Result<EnergyReport>;
}
