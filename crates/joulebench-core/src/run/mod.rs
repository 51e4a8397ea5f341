mod result;
mod types;

pub use result::{BenchmarkResult, RESULT_COLUMNS};
pub use types::{InferenceOutcome, Query, RunState};
