use joulebench_core::{BenchmarkResult, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Appends benchmark rows to per-run CSV files under one results directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<YYYYmmdd_HHMMSS>-<model>.csv` in the results directory.
    pub fn destination(&self, model: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.dir
            .join(format!("{}-{}.csv", timestamp, model.replace('/', "_")))
    }

    /// Writes `result` to a fresh timestamped file and returns its path.
    pub fn write(&self, result: &BenchmarkResult) -> Result<PathBuf> {
        let path = self.destination(&result.model);
        write_result(result, &path)?;
        tracing::info!("Wrote result for {} to {:?}", result.model, path);
        Ok(path)
    }
}

/// Appends `result` to `path`, writing the header first if the file is new
/// or empty.
pub fn write_result(result: &BenchmarkResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if needs_header {
        writer.write_record(result.columns())?;
    }
    writer.write_record(result.record())?;
    writer.flush()?;
    Ok(())
}
