pub mod compare;
pub mod meter;
pub mod ollama;
pub mod query_source;
pub mod runner;
pub mod writer;

pub use compare::{aggregate, read_results_dir, Comparison, ComparisonDataset, ResultRow, Series};
pub use meter::{
    ArtifactHandle, CumulativeMeter, CumulativeTracker, EnergyMeter, PowercapTracker, TraceBackend,
    TraceMeter, TraceSampler,
};
pub use ollama::{ChatResponse, InferenceService, OllamaClient};
pub use query_source::QuerySource;
pub use runner::{BenchmarkEvent, BenchmarkRun, BenchmarkRunner, RunConfig};
pub use writer::{write_result, ResultWriter};
