use async_trait::async_trait;
use joulebench_core::{JouleBenchError, Result};
use serde::{Deserialize, Serialize};

/// A local inference service that can fetch models and answer single-turn
/// chat prompts.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn pull(&self, model: &str) -> Result<()>;

    async fn chat(&self, model: &str, prompt: &str, temperature: Option<f32>)
        -> Result<ChatResponse>;
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PullRequest {
    model: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

impl OllamaClient {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let url = format!("{}{}", self.host, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| JouleBenchError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(JouleBenchError::OllamaError(format!(
                "{} failed: {} - {}",
                path, status, body
            )));
        }

        resp.text()
            .await
            .map_err(|e| JouleBenchError::Http(e.to_string()))
    }
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn pull(&self, model: &str) -> Result<()> {
        tracing::info!("Pulling model: {}", model);

        let request = PullRequest {
            model: model.to_string(),
            stream: false,
        };
        let body = self.post_json("/api/pull", &request).await?;

        let pulled: PullResponse = serde_json::from_str(&body)?;
        tracing::debug!("Pull status for {}: {}", model, pulled.status);
        Ok(())
    }

    async fn chat(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: temperature.map(|temperature| ChatOptions { temperature }),
        };

        let body = self.post_json("/api/chat", &request).await?;

        let chat_resp: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            JouleBenchError::Http(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                body.chars().take(500).collect::<String>()
            ))
        })?;

        Ok(chat_resp)
    }
}
