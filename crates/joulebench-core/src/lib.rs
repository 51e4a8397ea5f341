// Domain modules
pub mod budget;
pub mod config;
pub mod energy;
pub mod error;
pub mod run;
pub mod tokens;

pub use budget::{TimeBudget, WARMUP_SAMPLES};
pub use config::{
    DatasetConfig, DefaultsConfig, EnergyConfig, JouleBenchConfig, OllamaConfig, ResultsConfig,
};
pub use energy::{EnergyBackend, EnergyReport, EnergySample, EnergyUnit, JOULES_PER_KWH};
pub use error::{JouleBenchError, Result};
pub use run::{BenchmarkResult, InferenceOutcome, Query, RunState, RESULT_COLUMNS};
pub use tokens::{TokenAccountant, TokenTally};
