use serde::{Deserialize, Serialize};

/// One prompt from the conversation corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    pub prompt: String,
}

/// What a single timed inference call produced. Token counts are `None` when
/// the service did not report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub latency_secs: f64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub succeeded: bool,
}

impl InferenceOutcome {
    pub fn has_token_counts(&self) -> bool {
        self.input_tokens.is_some() && self.output_tokens.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Warming,
    Running,
    Stopped,
}
