use super::{counter_delta, detect_rocm_gpus, discover_rapl, EnergyCounter, RaplDomain, TraceBackend};
use joulebench_core::{EnergySample, EnergyUnit, JouleBenchError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

struct OpenSample {
    tag: String,
    timestamp: f64,
    started: Instant,
    readings: Vec<f64>,
}

/// Sample-trace backend over a set of energy counters. Every `record` closes
/// the current sample and opens a new one, so the trace partitions the
/// measurement window into tagged slices.
pub struct TraceSampler {
    counters: Vec<Box<dyn EnergyCounter>>,
    open: Option<OpenSample>,
    samples: Vec<EnergySample>,
}

impl TraceSampler {
    pub fn new(counters: Vec<Box<dyn EnergyCounter>>) -> Self {
        Self {
            counters,
            open: None,
            samples: Vec::new(),
        }
    }

    /// CPU package and GPU counters. DRAM is left out.
    pub fn detect(powercap_root: &Path) -> Self {
        let mut counters: Vec<Box<dyn EnergyCounter>> = discover_rapl(powercap_root)
            .into_iter()
            .filter(|c| c.domain() == RaplDomain::Package)
            .map(|c| Box::new(c) as Box<dyn EnergyCounter>)
            .collect();
        counters.extend(
            detect_rocm_gpus()
                .into_iter()
                .map(|c| Box::new(c) as Box<dyn EnergyCounter>),
        );

        info!(
            "Sample-trace backend using domains: {:?}",
            counters.iter().map(|c| c.name()).collect::<Vec<_>>()
        );
        Self::new(counters)
    }

    /// Native unit of every sampled domain.
    pub fn units(&self) -> BTreeMap<String, EnergyUnit> {
        self.counters
            .iter()
            .map(|c| (c.name().to_string(), c.unit()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn open(&mut self, tag: &str) -> Result<()> {
        let readings = self
            .counters
            .iter()
            .map(|c| c.read())
            .collect::<Result<Vec<f64>>>()?;
        self.open = Some(OpenSample {
            tag: tag.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            started: Instant::now(),
            readings,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(open) = self.open.take() else {
            return Err(JouleBenchError::Energy("sampler was not started".to_string()));
        };

        let duration_secs = open.started.elapsed().as_secs_f64();
        let mut energy = BTreeMap::new();
        for (counter, before) in self.counters.iter().zip(&open.readings) {
            let after = counter.read()?;
            energy.insert(
                counter.name().to_string(),
                counter_delta(*before, after, counter.wrap_range()),
            );
        }

        debug!("Closed sample '{}' after {:.2}s", open.tag, duration_secs);
        self.samples.push(EnergySample {
            tag: open.tag,
            timestamp: open.timestamp,
            duration_secs,
            energy,
        });
        Ok(())
    }

    /// Closes the current sample and starts a new one tagged `tag`.
    pub fn record(&mut self, tag: &str) -> Result<()> {
        self.close()?;
        self.open(tag)
    }
}

impl TraceBackend for TraceSampler {
    fn start(&mut self) -> Result<()> {
        self.samples.clear();
        self.open("run")
    }

    fn stop(&mut self) -> Result<()> {
        self.close()
    }

    fn trace(&self) -> Vec<EnergySample> {
        self.samples.clone()
    }
}
