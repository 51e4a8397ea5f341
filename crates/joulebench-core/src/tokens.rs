//! Per-query token bookkeeping with mean imputation for missing counts.

use crate::InferenceOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct TokenAccountant {
    input: Vec<u64>,
    output: Vec<u64>,
}

/// Token columns after imputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTally {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl TokenAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent counts are left as gaps and filled in by [`finalize`](Self::finalize).
    pub fn record(&mut self, outcome: &InferenceOutcome) {
        if let Some(n) = outcome.input_tokens {
            self.input.push(n);
        }
        if let Some(n) = outcome.output_tokens {
            self.output.push(n);
        }
    }

    /// Pads each column with the mean of its observed values until it holds
    /// `n_samples` entries. A column with no observations stays empty.
    pub fn finalize(self, n_samples: usize) -> TokenTally {
        TokenTally {
            input: impute(self.input, n_samples),
            output: impute(self.output, n_samples),
        }
    }
}

fn impute(observed: Vec<u64>, n_samples: usize) -> Vec<f64> {
    let mut column: Vec<f64> = observed.into_iter().map(|n| n as f64).collect();
    if column.is_empty() {
        return column;
    }

    let mean = column.iter().sum::<f64>() / column.len() as f64;
    if column.len() < n_samples {
        column.resize(n_samples, mean);
    }
    column
}

impl TokenTally {
    pub fn total_input(&self) -> f64 {
        self.input.iter().sum()
    }

    pub fn total_output(&self) -> f64 {
        self.output.iter().sum()
    }
}
