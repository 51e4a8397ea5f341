use joulebench_core::{JouleBenchError, Query, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
struct ConversationRecord {
    id: serde_json::Value,
    conversations: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
struct Turn {
    value: String,
}

/// Line-delimited conversation corpus. The file is parsed on first use and
/// kept for the rest of the process.
pub struct QuerySource {
    path: PathBuf,
    queries: OnceLock<Vec<Query>>,
}

impl QuerySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            queries: OnceLock::new(),
        }
    }

    pub fn queries(&self) -> Result<&[Query]> {
        if let Some(queries) = self.queries.get() {
            return Ok(queries);
        }

        let parsed = parse_corpus(&self.path)?;
        tracing::info!("Loaded {} queries from {:?}", parsed.len(), self.path);
        Ok(self.queries.get_or_init(|| parsed))
    }

    /// Prompt texts in corpus order, or a full random permutation of them.
    pub fn load(&self, randomize: bool) -> Result<Vec<String>> {
        let mut prompts: Vec<String> = self
            .queries()?
            .iter()
            .map(|q| q.prompt.clone())
            .collect();

        if randomize {
            prompts.shuffle(&mut rand::thread_rng());
        }

        Ok(prompts)
    }
}

fn parse_corpus(path: &Path) -> Result<Vec<Query>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        JouleBenchError::Dataset(format!("cannot read {}: {}", path.display(), e))
    })?;

    let mut queries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: ConversationRecord = serde_json::from_str(line).map_err(|e| {
            JouleBenchError::Dataset(format!("line {}: {}", idx + 1, e))
        })?;

        let first = record.conversations.into_iter().next().ok_or_else(|| {
            JouleBenchError::Dataset(format!("line {}: conversation is empty", idx + 1))
        })?;

        let id = match record.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        queries.push(Query {
            id,
            prompt: first.value,
        });
    }

    Ok(queries)
}
