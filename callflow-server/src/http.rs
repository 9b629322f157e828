//! CallFlow HTTP API
//!
//! Axum-based HTTP server that fronts the completion proxy.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET  /health    — liveness plus completion-backend status
//! - GET  /version   — server version info
//! - POST /api/agent — chat turn + board snapshot → `{reply}`

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use callflow_core::completion::CompletionBackend;
use callflow_core::CallflowConfig;
use chrono_tz::Tz;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::proxy;

/// Shared state for all HTTP handlers. Immutable after startup.
#[derive(Clone)]
pub struct HttpState {
    pub config: CallflowConfig,
    pub tz: Tz,
    /// `None` when no completion credential was found at startup.
    pub backend: Option<Arc<dyn CompletionBackend>>,
}

impl HttpState {
    pub fn new(config: CallflowConfig, backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        let tz = config.display.tz();
        Self {
            config,
            tz,
            backend,
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/agent", post(agent_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("CallFlow HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "completion_configured": state.backend.is_some(),
            "model": state.backend.as_ref().map(|b| b.model().to_string()),
        }),
    )
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "callflow/1",
    })
}

/// Inner agent — runs the proxy pipeline and maps the outcome to a status and
/// JSON body. `reply` is present only on success.
pub async fn agent_inner(state: &HttpState, body: &[u8]) -> (StatusCode, serde_json::Value) {
    match proxy::run_agent(state.backend.as_deref(), &state.tz, body).await {
        Ok(reply) => (StatusCode::OK, serde_json::json!({ "reply": reply })),
        Err(e) => (e.status(), serde_json::json!({ "error": e.public_message() })),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

/// Takes the raw body so that malformed JSON and wrong content types get the
/// same 400 shape as schema failures.
pub async fn agent_handler(
    State(state): State<Arc<HttpState>>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) = agent_inner(&state, &body).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "callflow/1");
    }

    #[test]
    fn test_health_inner_without_backend() {
        let state = HttpState::new(CallflowConfig::default(), None);
        let (status, body) = health_inner(&state);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["completion_configured"], false);
        assert!(body["model"].is_null());
    }

    #[tokio::test]
    async fn test_agent_inner_missing_credential() {
        let state = HttpState::new(CallflowConfig::default(), None);
        let body = serde_json::json!({
            "messages": [{ "role": "user", "content": "hi" }],
            "state": {}
        })
        .to_string();

        let (status, json) = agent_inner(&state, body.as_bytes()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "OpenAI API key is missing from the environment.");
        assert!(json.get("reply").is_none());
    }

    #[tokio::test]
    async fn test_agent_inner_invalid_body() {
        let state = HttpState::new(CallflowConfig::default(), None);
        let (status, json) = agent_inner(&state, b"[]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid payload for call agent.");
    }

    #[test]
    fn test_http_state_parses_display_timezone() {
        let mut config = CallflowConfig::default();
        config.display.timezone = "America/Chicago".to_string();
        let state = HttpState::new(config, None);
        assert_eq!(state.tz, chrono_tz::America::Chicago);
    }
}
