use thiserror::Error;

#[derive(Error, Debug)]
pub enum JouleBenchError {
    #[error("Ollama error: {0}")]
    OllamaError(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Energy measurement error: {0}")]
    Energy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, JouleBenchError>;
