use crate::{EnergyBackend, JouleBenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JouleBenchConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub energy: EnergyConfig,
}

impl JouleBenchConfig {
    /// Defaults overlaid with `OLLAMA_HOST`, `JOULEBENCH_DATASET` and
    /// `JOULEBENCH_RESULTS_DIR` from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.ollama.host = normalize_host(&host)?;
        }
        if let Ok(path) = std::env::var("JOULEBENCH_DATASET") {
            config.dataset.path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("JOULEBENCH_RESULTS_DIR") {
            config.results = ResultsConfig::under(PathBuf::from(dir));
        }

        Ok(config)
    }
}

/// Accepts `host:port` as well as full URLs, like the Ollama CLI does.
fn normalize_host(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(JouleBenchError::Config("OLLAMA_HOST is empty".to_string()));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    Ok(format!("http://{}", trimmed))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub cumulative_model: String,
    pub trace_model: String,
    pub temperature: f32,
    pub warmup_prompt: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cumulative_model: "gemma3:4b".to_string(),
            trace_model: "gemma3:1b".to_string(),
            temperature: 0.7,
            warmup_prompt: "Can you answer questions?".to_string(),
        }
    }
}

impl DefaultsConfig {
    pub fn model_for(&self, backend: EnergyBackend) -> &str {
        match backend {
            EnergyBackend::Cumulative => &self.cumulative_model,
            EnergyBackend::SampleTrace => &self.trace_model,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("llm_baseline_conversations_puffin.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    pub cumulative_dir: PathBuf,
    pub trace_dir: PathBuf,
}

impl ResultsConfig {
    pub fn under(parent: PathBuf) -> Self {
        Self {
            cumulative_dir: parent.join(EnergyBackend::Cumulative.slug()),
            trace_dir: parent.join(EnergyBackend::SampleTrace.slug()),
        }
    }

    pub fn dir_for(&self, backend: EnergyBackend) -> &PathBuf {
        match backend {
            EnergyBackend::Cumulative => &self.cumulative_dir,
            EnergyBackend::SampleTrace => &self.trace_dir,
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self::under(PathBuf::from("results"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    pub ram_sticks: u32,
    pub ram_watts_per_stick: f64,
    /// Run length the idle-memory correction is computed over.
    pub reference_run_secs: f64,
    pub artifact_path: PathBuf,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            ram_sticks: 2,
            ram_watts_per_stick: 5.0,
            reference_run_secs: 30.0 * 60.0,
            artifact_path: PathBuf::from("emissions.csv"),
        }
    }
}

impl EnergyConfig {
    pub fn ram_watts(&self) -> f64 {
        self.ram_sticks as f64 * self.ram_watts_per_stick
    }

    /// Joules of idle memory draw over one reference run.
    pub fn idle_memory_correction(&self) -> f64 {
        self.ram_watts() * self.reference_run_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_correction() {
        let energy = EnergyConfig::default();
        assert_eq!(energy.ram_watts(), 10.0);
        assert_eq!(energy.idle_memory_correction(), 18_000.0);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:11434").unwrap(), "http://localhost:11434");
        assert_eq!(normalize_host("https://box:1/").unwrap(), "https://box:1");
        assert!(normalize_host("  ").is_err());
    }

    #[test]
    fn test_results_dirs() {
        let results = ResultsConfig::under(PathBuf::from("out"));
        assert_eq!(results.dir_for(EnergyBackend::Cumulative), &PathBuf::from("out/cumulative"));
        assert_eq!(results.dir_for(EnergyBackend::SampleTrace), &PathBuf::from("out/trace"));
    }
}
