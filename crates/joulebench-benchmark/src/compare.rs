use joulebench_core::{EnergyBackend, JouleBenchError, Result};
use plotly::layout::BarMode;
use plotly::{Bar, Layout, Plot};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultRow {
    pub model: String,
    pub power_draw_total: f64,
}

fn read_rows(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<ResultRow>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Rows of every `*.csv` file in `dir`, keyed by file stem. Files that cannot
/// be parsed are logged and skipped.
pub fn read_results_dir(dir: &Path) -> Result<BTreeMap<String, Vec<ResultRow>>> {
    if !dir.is_dir() {
        return Err(JouleBenchError::Config(format!(
            "results folder {:?} not found",
            dir
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    let mut data = BTreeMap::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match read_rows(&path) {
            Ok(rows) => {
                info!("  {}: {} rows", stem, rows.len());
                data.insert(stem.to_string(), rows);
            }
            Err(e) => warn!("Error reading {:?}: {}", path, e),
        }
    }

    Ok(data)
}

/// Energy total per model from the first row of each result file. Files are
/// visited in name order, so when two files name the same model the most
/// recent timestamp wins.
pub fn aggregate(dir: &Path) -> Result<BTreeMap<String, f64>> {
    let data = read_results_dir(dir)?;
    info!("Found {} CSV files in {:?}", data.len(), dir);

    let mut totals = BTreeMap::new();
    for (file, rows) in data {
        let Some(first) = rows.into_iter().next() else {
            warn!("{}.csv has no rows, skipping", file);
            continue;
        };
        if let Some(previous) = totals.insert(first.model.clone(), first.power_draw_total) {
            warn!(
                "Model {} appears more than once; {}.csv replaces {}",
                first.model, file, previous
            );
        }
    }

    Ok(totals)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonDataset {
    pub backend: EnergyBackend,
    pub totals: BTreeMap<String, f64>,
}

impl ComparisonDataset {
    /// Totals for one backend. Backends that do not measure memory get
    /// `memory_correction` joules added to every model. An unreadable
    /// directory yields an empty dataset.
    pub fn load(backend: EnergyBackend, dir: &Path, memory_correction: f64) -> Self {
        let totals = match aggregate(dir) {
            Ok(totals) => totals,
            Err(e) => {
                warn!("{} results unavailable: {}", backend, e);
                BTreeMap::new()
            }
        };

        let dataset = Self { backend, totals };
        if backend.measures_memory() {
            dataset
        } else {
            dataset.with_correction(memory_correction)
        }
    }

    pub fn with_correction(mut self, joules: f64) -> Self {
        for total in self.totals.values_mut() {
            *total += joules;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Grouped comparison: one group per model, one bar per backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub models: Vec<String>,
    pub series: Vec<Series>,
}

impl Comparison {
    /// Models are the sorted union across datasets, so bars line up even when
    /// a model was only measured by one backend.
    pub fn new(datasets: &[ComparisonDataset]) -> Self {
        let models: Vec<String> = datasets
            .iter()
            .flat_map(|d| d.totals.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let series = datasets
            .iter()
            .map(|d| Series {
                label: d.backend.label().to_string(),
                values: models.iter().map(|m| d.totals.get(m).copied()).collect(),
            })
            .collect();

        Self { models, series }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn to_html(&self) -> String {
        let mut plot = Plot::new();
        for series in &self.series {
            let trace = Bar::new(self.models.clone(), series.values.clone()).name(series.label.as_str());
            plot.add_trace(trace);
        }
        plot.set_layout(Layout::new().bar_mode(BarMode::Group));
        plot.to_html()
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_html())?;
        info!("Wrote comparison chart to {:?}", path);
        Ok(())
    }
}
