use joulebench_core::{EnergyUnit, JouleBenchError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A monotonically increasing hardware energy counter.
pub trait EnergyCounter: Send {
    fn name(&self) -> &str;

    fn unit(&self) -> EnergyUnit;

    /// Current counter value in [`unit`](Self::unit).
    fn read(&self) -> Result<f64>;

    /// Value at which the counter wraps back to zero, if known.
    fn wrap_range(&self) -> Option<f64> {
        None
    }
}

/// Energy accumulated between two readings, allowing for a single wrap.
pub fn counter_delta(start: f64, end: f64, wrap_range: Option<f64>) -> f64 {
    if end >= start {
        return end - start;
    }
    match wrap_range {
        Some(range) => end + range - start,
        None => {
            warn!("Energy counter went backwards ({} -> {}), treating as 0", start, end);
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaplDomain {
    Package,
    Dram,
    /// core, uncore and psys zones overlap the package and are not summed.
    Other,
}

/// One Linux powercap RAPL zone, read through `energy_uj`.
#[derive(Debug, Clone)]
pub struct RaplCounter {
    name: String,
    zone: PathBuf,
    domain: RaplDomain,
    max_range: Option<f64>,
}

impl RaplCounter {
    pub fn domain(&self) -> RaplDomain {
        self.domain
    }

    fn from_zone(zone: PathBuf) -> Option<Self> {
        let dir_name = zone.file_name()?.to_str()?.to_string();
        let raw_name = std::fs::read_to_string(zone.join("name")).ok()?;
        let raw_name = raw_name.trim();
        let package = package_index(&dir_name);

        let (domain, name) = if let Some(idx) = raw_name.strip_prefix("package-") {
            (RaplDomain::Package, format!("package_{}", idx))
        } else if raw_name == "dram" {
            (RaplDomain::Dram, format!("dram_{}", package))
        } else {
            (RaplDomain::Other, format!("{}_{}", raw_name, package))
        };

        let max_range = std::fs::read_to_string(zone.join("max_energy_range_uj"))
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok());

        Some(Self {
            name,
            zone,
            domain,
            max_range,
        })
    }
}

/// `intel-rapl:1:0` -> `1`
fn package_index(dir_name: &str) -> String {
    dir_name
        .split(':')
        .nth(1)
        .unwrap_or("0")
        .to_string()
}

impl EnergyCounter for RaplCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn unit(&self) -> EnergyUnit {
        EnergyUnit::MicroJoule
    }

    fn read(&self) -> Result<f64> {
        let path = self.zone.join("energy_uj");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            JouleBenchError::Energy(format!("cannot read {}: {}", path.display(), e))
        })?;
        raw.trim().parse::<f64>().map_err(|e| {
            JouleBenchError::Energy(format!("bad value in {}: {}", path.display(), e))
        })
    }

    fn wrap_range(&self) -> Option<f64> {
        self.max_range
    }
}

/// Readable RAPL zones under a powercap root (normally `/sys/class/powercap`).
/// Zones that cannot be read are skipped.
pub fn discover_rapl(root: &Path) -> Vec<RaplCounter> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No powercap interface at {:?}: {}", root, e);
            return Vec::new();
        }
    };

    let mut zones: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("intel-rapl:"))
        })
        .collect();
    zones.sort();

    let mut counters = Vec::new();
    for zone in zones {
        let Some(counter) = RaplCounter::from_zone(zone.clone()) else {
            debug!("Skipping unnamed powercap zone {:?}", zone);
            continue;
        };
        if let Err(e) = counter.read() {
            warn!("Skipping RAPL zone {}: {}", counter.name, e);
            continue;
        }
        debug!("Found RAPL zone {} at {:?}", counter.name, counter.zone);
        counters.push(counter);
    }

    counters
}
