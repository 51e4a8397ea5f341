use super::EnergyCounter;
use joulebench_core::{EnergyUnit, JouleBenchError, Result};
use std::process::Command;
use tracing::{debug, error, info};

const ACCUMULATED_KEY: &str = "Accumulated Energy (uJ)";

/// Accumulated energy of one AMD GPU as reported by `rocm-smi`.
#[derive(Debug, Clone)]
pub struct RocmSmiCounter {
    card: String,
    name: String,
}

impl RocmSmiCounter {
    pub fn new(index: usize) -> Self {
        Self {
            card: format!("card{}", index),
            name: format!("amd_gpu_{}", index),
        }
    }
}

fn query_energy() -> Result<String> {
    let output = Command::new("rocm-smi")
        .arg("--showenergycounter")
        .arg("--json")
        .output();

    match output {
        Ok(out) if out.status.success() => Ok(String::from_utf8_lossy(&out.stdout).to_string()),
        Ok(out) => Err(JouleBenchError::Energy(format!(
            "rocm-smi exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(JouleBenchError::Energy(
            "rocm-smi not found - is ROCm installed?".to_string(),
        )),
        Err(e) => {
            error!("rocm-smi execution failed: {}", e);
            Err(JouleBenchError::Io(e))
        }
    }
}

/// Accumulated micro-joules for `card` from `rocm-smi --json` output.
fn parse_accumulated(raw: &str, card: &str) -> Option<f64> {
    let json: serde_json::Value = serde_json::from_str(raw).ok()?;
    let value = json.get(card)?.get(ACCUMULATED_KEY)?;
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn cards_with_energy(raw: &str) -> Vec<usize> {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };

    let mut cards: Vec<usize> = map
        .iter()
        .filter(|(_, v)| v.get(ACCUMULATED_KEY).is_some())
        .filter_map(|(k, _)| k.strip_prefix("card")?.parse().ok())
        .collect();
    cards.sort_unstable();
    cards
}

impl EnergyCounter for RocmSmiCounter {
    fn name(&self) -> &str {
        &self.name
    }

    fn unit(&self) -> EnergyUnit {
        EnergyUnit::MicroJoule
    }

    fn read(&self) -> Result<f64> {
        let raw = query_energy()?;
        parse_accumulated(&raw, &self.card).ok_or_else(|| {
            JouleBenchError::Energy(format!("no energy counter for {} in rocm-smi output", self.card))
        })
    }
}

/// GPUs that expose an energy counter. Empty when `rocm-smi` is unavailable.
pub fn detect_rocm_gpus() -> Vec<RocmSmiCounter> {
    match query_energy() {
        Ok(raw) => {
            let counters: Vec<RocmSmiCounter> = cards_with_energy(&raw)
                .into_iter()
                .map(RocmSmiCounter::new)
                .collect();
            info!("rocm-smi reports {} GPU energy counter(s)", counters.len());
            counters
        }
        Err(e) => {
            debug!("No ROCm GPU energy counters: {}", e);
            Vec::new()
        }
    }
}
