use super::{
    counter_delta, detect_rocm_gpus, discover_rapl, ArtifactHandle, CumulativeSummary,
    CumulativeTracker, EnergyCounter, RaplDomain,
};
use joulebench_core::{EnergyUnit, JouleBenchError, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

type Counters = Vec<Box<dyn EnergyCounter>>;

struct Snapshot {
    started: Instant,
    cpu: Vec<f64>,
    gpu: Vec<f64>,
    ram: Vec<f64>,
}

/// Cumulative tracker over hardware energy counters. CPU packages, GPUs and
/// DRAM are tracked as separate groups; without a DRAM counter, memory energy
/// is estimated from a fixed wattage.
pub struct PowercapTracker {
    cpu: Counters,
    gpu: Counters,
    ram: Counters,
    ram_watts: f64,
    snapshot: Option<Snapshot>,
}

impl PowercapTracker {
    pub fn new(cpu: Counters, gpu: Counters, ram: Counters, ram_watts: f64) -> Self {
        Self {
            cpu,
            gpu,
            ram,
            ram_watts,
            snapshot: None,
        }
    }

    /// Builds the tracker from the RAPL zones under `powercap_root` and any
    /// GPUs `rocm-smi` reports.
    pub fn detect(powercap_root: &Path, ram_watts: f64) -> Self {
        let mut cpu: Counters = Vec::new();
        let mut ram: Counters = Vec::new();

        for counter in discover_rapl(powercap_root) {
            match counter.domain() {
                RaplDomain::Package => cpu.push(Box::new(counter)),
                RaplDomain::Dram => ram.push(Box::new(counter)),
                RaplDomain::Other => {}
            }
        }

        let gpu: Counters = detect_rocm_gpus()
            .into_iter()
            .map(|c| Box::new(c) as Box<dyn EnergyCounter>)
            .collect();

        if cpu.is_empty() {
            warn!("No readable CPU package counters; CPU energy will be reported as 0");
        }
        if ram.is_empty() {
            info!("No DRAM counter; estimating memory energy at {:.1} W", ram_watts);
        }
        info!(
            "Cumulative tracker using {} CPU, {} GPU, {} DRAM counter(s)",
            cpu.len(),
            gpu.len(),
            ram.len()
        );

        Self::new(cpu, gpu, ram, ram_watts)
    }
}

fn read_all(counters: &Counters) -> Result<Vec<f64>> {
    counters.iter().map(|c| c.read()).collect()
}

/// Joules accumulated by a counter group since `start`.
fn group_joules(counters: &Counters, start: &[f64]) -> Result<f64> {
    let mut joules = 0.0;
    for (counter, before) in counters.iter().zip(start) {
        let after = counter.read()?;
        let delta = counter_delta(*before, after, counter.wrap_range());
        joules += counter.unit().to_joules(delta);
    }
    Ok(joules)
}

impl CumulativeTracker for PowercapTracker {
    fn start(&mut self) -> Result<()> {
        self.snapshot = Some(Snapshot {
            started: Instant::now(),
            cpu: read_all(&self.cpu)?,
            gpu: read_all(&self.gpu)?,
            ram: read_all(&self.ram)?,
        });
        Ok(())
    }

    fn stop(&mut self, artifact: &ArtifactHandle) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| JouleBenchError::Energy("tracker was not started".to_string()))?;

        let duration = snapshot.started.elapsed().as_secs_f64();
        let cpu = group_joules(&self.cpu, &snapshot.cpu)?;
        let gpu = group_joules(&self.gpu, &snapshot.gpu)?;
        let ram = if self.ram.is_empty() {
            self.ram_watts * duration
        } else {
            group_joules(&self.ram, &snapshot.ram)?
        };

        let power = |joules: f64| if duration > 0.0 { joules / duration } else { 0.0 };
        let kwh = EnergyUnit::KilowattHour;
        let summary = CumulativeSummary {
            timestamp: chrono::Local::now().to_rfc3339(),
            run_id: uuid::Uuid::new_v4().to_string(),
            duration,
            energy_consumed: kwh.from_joules(cpu + gpu + ram),
            cpu_energy: kwh.from_joules(cpu),
            gpu_energy: kwh.from_joules(gpu),
            ram_energy: kwh.from_joules(ram),
            cpu_power: power(cpu),
            gpu_power: power(gpu),
            ram_power: power(ram),
        };

        artifact.write_summary(&summary)
    }
}
