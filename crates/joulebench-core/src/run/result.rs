use crate::{EnergyBackend, EnergyReport, JouleBenchError, Result, TokenTally};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns every result file starts with. Component energies, when the
/// backend reports them, follow as `<component>_energy`.
pub const RESULT_COLUMNS: [&str; 7] = [
    "model",
    "running_time_total",
    "power_draw_total",
    "n_tokens_in",
    "n_tokens_out",
    "running_time",
    "power_draw",
];

/// The row persisted for one benchmark run. Per-query averages are derived
/// from the totals and `n_samples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub model: String,
    pub backend: EnergyBackend,
    pub n_samples: usize,
    pub running_time_total: f64,
    pub power_draw_total: f64,
    pub n_tokens_in: f64,
    pub n_tokens_out: f64,
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
}

impl BenchmarkResult {
    pub fn from_run(
        model: &str,
        backend: EnergyBackend,
        report: EnergyReport,
        tokens: &TokenTally,
        n_samples: usize,
    ) -> Result<Self> {
        if n_samples == 0 {
            return Err(JouleBenchError::Dataset(
                "no queries were processed".to_string(),
            ));
        }

        Ok(Self {
            model: model.to_string(),
            backend,
            n_samples,
            running_time_total: report.duration_secs,
            power_draw_total: report.total_energy,
            n_tokens_in: tokens.total_input(),
            n_tokens_out: tokens.total_output(),
            components: report.components,
        })
    }

    pub fn running_time(&self) -> f64 {
        self.running_time_total / self.n_samples as f64
    }

    pub fn power_draw(&self) -> f64 {
        self.power_draw_total / self.n_samples as f64
    }

    pub fn columns(&self) -> Vec<String> {
        RESULT_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.components.keys().map(|name| format!("{}_energy", name)))
            .collect()
    }

    pub fn record(&self) -> Vec<String> {
        let mut row = vec![
            self.model.clone(),
            self.running_time_total.to_string(),
            self.power_draw_total.to_string(),
            self.n_tokens_in.to_string(),
            self.n_tokens_out.to_string(),
            self.running_time().to_string(),
            self.power_draw().to_string(),
        ];
        row.extend(self.components.values().map(|v| v.to_string()));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(input: &[f64], output: &[f64]) -> TokenTally {
        TokenTally {
            input: input.to_vec(),
            output: output.to_vec(),
        }
    }

    #[test]
    fn test_averages_derived_from_totals() {
        let report = EnergyReport::new(120.0, 600.0);
        let result = BenchmarkResult::from_run(
            "gemma3:1b",
            EnergyBackend::SampleTrace,
            report,
            &tally(&[10.0, 20.0, 30.0], &[1.0, 2.0, 3.0]),
            3,
        )
        .unwrap();

        assert_eq!(result.running_time(), 40.0);
        assert_eq!(result.power_draw(), 200.0);
        assert_eq!(result.n_tokens_in, 60.0);
        assert_eq!(result.n_tokens_out, 6.0);
        assert_eq!(result.columns(), RESULT_COLUMNS.map(String::from).to_vec());
    }

    #[test]
    fn test_component_columns_follow_base_columns() {
        let report = EnergyReport::new(10.0, 6.0)
            .with_component("ram", 1.0)
            .with_component("cpu", 3.0)
            .with_component("gpu", 2.0);
        let result = BenchmarkResult::from_run(
            "gemma3:4b",
            EnergyBackend::Cumulative,
            report,
            &TokenTally::default(),
            2,
        )
        .unwrap();

        let columns = result.columns();
        assert_eq!(&columns[7..], &["cpu_energy", "gpu_energy", "ram_energy"]);
        let record = result.record();
        assert_eq!(record.len(), columns.len());
        assert_eq!(&record[7..], &["3", "2", "1"]);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let result = BenchmarkResult::from_run(
            "m",
            EnergyBackend::Cumulative,
            EnergyReport::zero(),
            &TokenTally::default(),
            0,
        );
        assert!(result.is_err());
    }
}
