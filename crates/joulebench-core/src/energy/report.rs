use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend-independent energy summary of one measured run. Energies are in
/// joules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyReport {
    pub duration_secs: f64,
    pub total_energy: f64,
    /// Per-component share of `total_energy`, empty when the backend does not
    /// break it down.
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

impl EnergyReport {
    pub fn new(duration_secs: f64, total_energy: f64) -> Self {
        Self {
            duration_secs,
            total_energy,
            components: BTreeMap::new(),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, name: impl Into<String>, energy: f64) -> Self {
        self.components.insert(name.into(), energy);
        self
    }
}

/// One timed slice of a sample-trace measurement. Energy values are in the
/// native unit of each domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub tag: String,
    /// Seconds since the Unix epoch at which the sample began.
    pub timestamp: f64,
    pub duration_secs: f64,
    pub energy: BTreeMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_report() {
        let report = EnergyReport::zero();
        assert_eq!(report.duration_secs, 0.0);
        assert_eq!(report.total_energy, 0.0);
        assert!(report.components.is_empty());
    }

    #[test]
    fn test_components_keyed_by_name() {
        let report = EnergyReport::new(10.0, 250.0).with_component("cpu", 250.0);
        assert_eq!(report.total_energy, 250.0);
        assert_eq!(report.components["cpu"], 250.0);
    }
}
