use serde::{Deserialize, Serialize};
use std::fmt;

/// How a measurement backend reports energy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyBackend {
    /// One summary report covering the whole run.
    Cumulative,
    /// A sequence of discrete timed samples.
    SampleTrace,
}

impl EnergyBackend {
    pub fn label(&self) -> &'static str {
        match self {
            EnergyBackend::Cumulative => "Cumulative",
            EnergyBackend::SampleTrace => "Sample trace",
        }
    }

    /// Directory and file-name friendly identifier.
    pub fn slug(&self) -> &'static str {
        match self {
            EnergyBackend::Cumulative => "cumulative",
            EnergyBackend::SampleTrace => "trace",
        }
    }

    /// Whether the backend measures memory energy itself.
    pub fn measures_memory(&self) -> bool {
        matches!(self, EnergyBackend::Cumulative)
    }
}

impl fmt::Display for EnergyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
