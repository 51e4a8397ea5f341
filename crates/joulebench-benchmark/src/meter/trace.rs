use super::EnergyMeter;
use joulebench_core::{EnergyBackend, EnergyReport, EnergySample, EnergyUnit, JouleBenchError, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// A measurement backend that records a trace of timed samples.
pub trait TraceBackend: Send {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Samples recorded between the last `start` and `stop`.
    fn trace(&self) -> Vec<EnergySample>;
}

/// Reduces a trace to one report: durations are summed, and each domain is
/// converted to joules with its own unit before being added to the total.
pub fn summarize(samples: &[EnergySample], units: &BTreeMap<String, EnergyUnit>) -> EnergyReport {
    let mut duration = 0.0;
    let mut energy = 0.0;
    let mut unknown = BTreeSet::new();

    for sample in samples {
        duration += sample.duration_secs;
        for (domain, value) in &sample.energy {
            match units.get(domain) {
                Some(unit) => energy += unit.to_joules(*value),
                None => {
                    unknown.insert(domain.as_str());
                }
            }
        }
    }

    if !unknown.is_empty() {
        warn!("Ignoring energy domains without a unit: {:?}", unknown);
    }

    EnergyReport::new(duration, energy)
}

pub struct TraceMeter<B> {
    backend: B,
    units: BTreeMap<String, EnergyUnit>,
    running: bool,
}

impl<B: TraceBackend> TraceMeter<B> {
    pub fn new(backend: B, units: BTreeMap<String, EnergyUnit>) -> Self {
        Self {
            backend,
            units,
            running: false,
        }
    }
}

impl<B: TraceBackend> EnergyMeter for TraceMeter<B> {
    fn backend(&self) -> EnergyBackend {
        EnergyBackend::SampleTrace
    }

    fn start(&mut self) -> Result<()> {
        self.backend.start()?;
        self.running = true;
        info!("Sample-trace energy metering started");
        Ok(())
    }

    fn stop(&mut self) -> Result<EnergyReport> {
        if !self.running {
            return Err(JouleBenchError::Energy("meter was not started".to_string()));
        }
        self.running = false;

        self.backend.stop()?;
        let trace = self.backend.trace();
        let report = summarize(&trace, &self.units);

        info!(
            "Sample-trace energy metering stopped: {} sample(s), {:.1}s, {:.1} J",
            trace.len(),
            report.duration_secs,
            report.total_energy
        );
        Ok(report)
    }
}
