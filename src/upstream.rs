//! Ollama API client.
//!
//! Thin wrapper over a shared `reqwest::Client` for the two upstream
//! endpoints the relay uses:
//! - GET  /api/tags   (model listing)
//! - POST /api/chat   (buffered and streaming chat)

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP {status} from Ollama: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request to Ollama failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One role/content pair. Role values are passed through unchecked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat payload forwarded to POST /api/chat.
///
/// `options` is an opaque bag of inference tuning parameters, forwarded
/// unmodified. `stream` is always set by the relay, never by the caller.
#[derive(Debug, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: serde_json::Map<String, Value>,
    pub stream: bool,
}

/// Non-streaming response from /api/chat.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Response from /api/tags.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    name: String,
}

/// Client for the upstream Ollama server.
///
/// Cheap to clone: the inner `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    chat_timeout: Duration,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, chat_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            chat_timeout,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    /// List the names of the models loaded upstream, sorted ascending.
    ///
    /// Records without a name are skipped.
    pub async fn list_models(&self) -> Result<Vec<String>, UpstreamError> {
        let response = self.http.get(self.tags_url()).send().await?;
        let response = check_status(response).await?;
        let tags: TagsResponse = response.json().await?;

        let mut names: Vec<String> = tags
            .models
            .into_iter()
            .map(|m| m.name)
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        Ok(names)
    }

    /// One blocking chat call with `stream: false` and a bounded total wait.
    ///
    /// Returns the assistant reply text, empty if the response carried no
    /// message content.
    pub async fn chat(&self, mut payload: ChatPayload) -> Result<String, UpstreamError> {
        payload.stream = false;

        let response = self
            .http
            .post(self.chat_url())
            .timeout(self.chat_timeout)
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response).await?;

        let chat: ChatResponse = response.json().await?;
        Ok(chat.message.map(|m| m.content).unwrap_or_default())
    }

    /// Open a streaming chat call with `stream: true` forced and no timeout.
    ///
    /// Generation time is open-ended, so the response is returned raw for
    /// line-by-line consumption by the stream translator.
    pub async fn chat_stream(&self, mut payload: ChatPayload) -> Result<reqwest::Response, UpstreamError> {
        payload.stream = true;

        let response = self
            .http
            .post(self.chat_url())
            .json(&payload)
            .send()
            .await?;
        check_status(response).await
    }
}

/// Convert a non-success response into [`UpstreamError::Status`], keeping the
/// raw body for the caller-visible error payload.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status { status, body })
}
