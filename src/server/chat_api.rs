//! Relay HTTP API.
//!
//! Routes:
//! - GET  /               bundled chat page
//! - GET  /static/app.js  bundled client script
//! - GET  /health
//! - GET  /models
//! - POST /chat           buffered reply as plain text
//! - POST /chat_stream    incremental reply as a chunked plain-text body

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::server::streaming::relay_chat_stream;
use crate::upstream::{ChatMessage, ChatPayload, OllamaClient, UpstreamError};

/// Front-end assets, embedded at compile time.
const INDEX_HTML: &str = include_str!("../../static/index.html");
const APP_JS: &str = include_str!("../../static/app.js");

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub ollama: OllamaClient,
}

/// Build the axum router with all relay routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/app.js", get(app_js))
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/chat", post(chat))
        .route("/chat_stream", post(chat_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Inbound chat request, shared by /chat and /chat_stream.
///
/// Fields default so that missing `model`/`messages` reach validation and
/// produce a 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: serde_json::Map<String, Value>,
}

impl ChatRequest {
    /// Required-field validation. Role values are deliberately unchecked.
    fn validate(&self) -> Result<(), ApiError> {
        if self.model.trim().is_empty() || self.messages.is_empty() {
            return Err(ApiError::InvalidRequest);
        }
        Ok(())
    }

    fn into_payload(self, stream: bool) -> ChatPayload {
        ChatPayload {
            model: self.model,
            messages: self.messages,
            options: self.options,
            stream,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ollama_url: String,
}

/// Model listing response.
#[derive(Debug, Serialize)]
pub struct ModelList {
    pub models: Vec<String>,
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// Gateway-level request failure, rendered as a JSON error body.
///
/// Validation failures never reach upstream; upstream failures carry the
/// status and raw body back to the caller instead of surfacing opaquely.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("model and messages are required")]
    InvalidRequest,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ApiError::Upstream(UpstreamError::Status { status, body }) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": format!("HTTP {} from Ollama", status.as_u16()),
                    "body": body,
                })),
            )
                .into_response(),
            ApiError::Upstream(UpstreamError::Transport(e)) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("proxy exception: {e}") })),
            )
                .into_response(),
        }
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], APP_JS)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ollama_url: state.config.ollama_url.clone(),
    })
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelList>, ApiError> {
    let models = state.ollama.list_models().await?;
    Ok(Json(ModelList { models }))
}

/// Buffered chat: one bounded upstream call, full reply as plain text.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<String, ApiError> {
    req.validate()?;

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = request_id,
        model = req.model,
        messages = req.messages.len(),
        stream = false,
        "Chat request"
    );

    let text = state.ollama.chat(req.into_payload(false)).await?;
    Ok(text)
}

/// Streaming chat: unbounded upstream call relayed as chunked plain text.
///
/// Caching is disabled so intermediaries flush chunks through immediately.
async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    req.validate()?;

    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = request_id,
        model = req.model,
        messages = req.messages.len(),
        stream = true,
        "Chat request"
    );

    let stream = relay_chat_stream(state.ollama.clone(), req.into_payload(true));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
