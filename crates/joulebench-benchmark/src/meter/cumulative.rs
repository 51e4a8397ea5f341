use super::EnergyMeter;
use joulebench_core::{EnergyBackend, EnergyReport, EnergyUnit, JouleBenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One row of the summary artifact a cumulative tracker leaves behind.
/// Energies are in kWh, powers in watts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeSummary {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub run_id: String,
    pub duration: f64,
    pub energy_consumed: f64,
    pub cpu_energy: f64,
    pub gpu_energy: f64,
    pub ram_energy: f64,
    #[serde(default)]
    pub cpu_power: f64,
    #[serde(default)]
    pub gpu_power: f64,
    #[serde(default)]
    pub ram_power: f64,
}

impl CumulativeSummary {
    pub fn into_report(self) -> EnergyReport {
        let kwh = EnergyUnit::KilowattHour;
        EnergyReport::new(self.duration, kwh.to_joules(self.energy_consumed))
            .with_component("cpu", kwh.to_joules(self.cpu_energy))
            .with_component("gpu", kwh.to_joules(self.gpu_energy))
            .with_component("ram", kwh.to_joules(self.ram_energy))
    }
}

/// The summary artifact location for one meter. The meter that owns the
/// handle clears it before a run and deletes it once read.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    path: PathBuf,
}

impl ArtifactHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed stale artifact {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites the artifact with a single summary row.
    pub fn write_summary(&self, summary: &CumulativeSummary) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.serialize(summary)?;
        writer.flush()?;
        Ok(())
    }

    /// First summary row, or `None` when the artifact is missing or empty.
    pub fn read_summary(&self) -> Result<Option<CumulativeSummary>> {
        if !self.exists() {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        match reader.deserialize::<CumulativeSummary>().next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Reads the summary and deletes the artifact.
    pub fn consume(&self) -> Result<Option<CumulativeSummary>> {
        let summary = self.read_summary()?;
        self.clear()?;
        Ok(summary)
    }
}

/// A measurement backend that produces one summary per run.
pub trait CumulativeTracker: Send {
    fn start(&mut self) -> Result<()>;

    /// Ends tracking and writes the run summary to `artifact`.
    fn stop(&mut self, artifact: &ArtifactHandle) -> Result<()>;
}

pub struct CumulativeMeter<T> {
    tracker: T,
    artifact: ArtifactHandle,
    running: bool,
}

impl<T: CumulativeTracker> CumulativeMeter<T> {
    pub fn new(tracker: T, artifact: ArtifactHandle) -> Self {
        Self {
            tracker,
            artifact,
            running: false,
        }
    }
}

impl<T: CumulativeTracker> EnergyMeter for CumulativeMeter<T> {
    fn backend(&self) -> EnergyBackend {
        EnergyBackend::Cumulative
    }

    fn start(&mut self) -> Result<()> {
        self.artifact.clear()?;
        self.tracker.start()?;
        self.running = true;
        info!("Cumulative energy tracking started");
        Ok(())
    }

    fn stop(&mut self) -> Result<EnergyReport> {
        if !self.running {
            return Err(JouleBenchError::Energy("meter was not started".to_string()));
        }
        self.running = false;

        self.tracker.stop(&self.artifact)?;
        let report = match self.artifact.consume()? {
            Some(summary) => summary.into_report(),
            None => {
                warn!(
                    "No energy summary found at {:?}, reporting zero energy",
                    self.artifact.path()
                );
                CumulativeSummary::default().into_report()
            }
        };

        info!(
            "Cumulative energy tracking stopped: {:.1}s, {:.1} J",
            report.duration_secs, report.total_energy
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joulebench_core::{BenchmarkResult, TokenTally};

    /// Writes a fixed summary, or nothing at all.
    struct FixedTracker {
        summary: Option<CumulativeSummary>,
        started: bool,
    }

    impl CumulativeTracker for FixedTracker {
        fn start(&mut self) -> Result<()> {
            self.started = true;
            Ok(())
        }

        fn stop(&mut self, artifact: &ArtifactHandle) -> Result<()> {
            if let Some(summary) = &self.summary {
                artifact.write_summary(summary)?;
            }
            Ok(())
        }
    }

    fn summary() -> CumulativeSummary {
        CumulativeSummary {
            duration: 60.0,
            energy_consumed: 0.001,
            cpu_energy: 0.0005,
            gpu_energy: 0.0004,
            ram_energy: 0.0001,
            ..Default::default()
        }
    }

    #[test]
    fn test_report_converted_from_kwh() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactHandle::new(dir.path().join("emissions.csv"));
        let tracker = FixedTracker {
            summary: Some(summary()),
            started: false,
        };
        let mut meter = CumulativeMeter::new(tracker, artifact.clone());

        meter.start().unwrap();
        assert!(meter.tracker.started);
        let report = meter.stop().unwrap();

        assert_eq!(report.duration_secs, 60.0);
        assert!((report.total_energy - 3600.0).abs() < 1e-9);
        assert!((report.components["cpu"] - 1800.0).abs() < 1e-9);
        assert!((report.components["gpu"] - 1440.0).abs() < 1e-9);
        assert!((report.components["ram"] - 360.0).abs() < 1e-9);
        assert!(!artifact.exists(), "artifact must be deleted after reading");
    }

    #[test]
    fn test_stale_artifact_cleared_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactHandle::new(dir.path().join("emissions.csv"));
        artifact.write_summary(&summary()).unwrap();

        let tracker = FixedTracker {
            summary: None,
            started: false,
        };
        let mut meter = CumulativeMeter::new(tracker, artifact.clone());
        meter.start().unwrap();
        assert!(!artifact.exists());

        let report = meter.stop().unwrap();
        assert_eq!(report.total_energy, 0.0);
    }

    #[test]
    fn test_missing_artifact_keeps_component_columns() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FixedTracker {
            summary: None,
            started: false,
        };
        let mut meter = CumulativeMeter::new(tracker, ArtifactHandle::new(dir.path().join("e.csv")));

        meter.start().unwrap();
        let report = meter.stop().unwrap();
        assert_eq!(report.components.len(), 3);
        assert!(report.components.values().all(|v| *v == 0.0));

        let result = BenchmarkResult::from_run(
            "gemma3:4b",
            EnergyBackend::Cumulative,
            report,
            &TokenTally::default(),
            3,
        )
        .unwrap();
        let columns = result.columns();
        assert_eq!(columns.len(), 10);
        assert_eq!(&columns[7..], &["cpu_energy", "gpu_energy", "ram_energy"]);
    }

    #[test]
    fn test_empty_artifact_is_zero_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emissions.csv");
        let artifact = ArtifactHandle::new(&path);
        std::fs::write(&path, "duration,energy_consumed,cpu_energy,gpu_energy,ram_energy\n").unwrap();

        assert_eq!(artifact.consume().unwrap(), None);
        assert!(!artifact.exists());
    }

    #[test]
    fn test_reads_foreign_artifact_with_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emissions.csv");
        std::fs::write(
            &path,
            "timestamp,project_name,duration,emissions,energy_consumed,cpu_energy,gpu_energy,ram_energy\n\
             2025-01-01T00:00:00,codecarbon,12.5,0.1,0.002,0.001,0.0008,0.0002\n",
        )
        .unwrap();

        let summary = ArtifactHandle::new(&path).read_summary().unwrap().unwrap();
        assert_eq!(summary.duration, 12.5);
        assert_eq!(summary.energy_consumed, 0.002);
        assert_eq!(summary.cpu_power, 0.0);
    }

    #[test]
    fn test_stop_without_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = FixedTracker {
            summary: None,
            started: false,
        };
        let mut meter = CumulativeMeter::new(tracker, ArtifactHandle::new(dir.path().join("e.csv")));
        assert!(meter.stop().is_err());
    }
}
