//! Completion proxy pipeline
//!
//! validate → credential check → render context → forward → reply.
//!
//! Each early exit is a [`ProxyError`] variant carrying its HTTP status and
//! a fixed public message. Causes are logged here and never returned to the
//! caller.

use axum::http::StatusCode;
use callflow_core::api::{
    AgentRequest, EMPTY_COMPLETION, INVALID_PAYLOAD, MISSING_API_KEY, UPSTREAM_UNAVAILABLE,
};
use callflow_core::completion::{CompletionBackend, CompletionError, CompletionRequest};
use callflow_core::context::build_system_instruction;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid agent payload: {0}")]
    Validation(String),

    #[error("Completion credential is not configured")]
    Configuration,

    #[error("Completion request failed: {0}")]
    Upstream(#[from] CompletionError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::Validation(_) => INVALID_PAYLOAD,
            ProxyError::Configuration => MISSING_API_KEY,
            ProxyError::Upstream(_) => UPSTREAM_UNAVAILABLE,
        }
    }
}

/// Run one agent request end to end and return the reply text.
///
/// The backend is only contacted once the body validates and a backend is
/// configured.
pub async fn run_agent(
    backend: Option<&dyn CompletionBackend>,
    tz: &Tz,
    body: &[u8],
) -> Result<String, ProxyError> {
    let request = AgentRequest::parse(body).map_err(|reason| {
        tracing::warn!(reason = %reason, "Rejected agent payload");
        ProxyError::Validation(reason)
    })?;

    let backend = backend.ok_or_else(|| {
        tracing::error!("OPENAI_API_KEY is not set; agent request refused");
        ProxyError::Configuration
    })?;

    let completion = CompletionRequest {
        system: build_system_instruction(&request.state, tz),
        messages: request.messages,
    };

    let reply = backend.complete(&completion).await.map_err(|e| {
        tracing::error!(backend = backend.name(), error = %e, "Completion request failed");
        ProxyError::Upstream(e)
    })?;

    Ok(reply.unwrap_or_else(|| EMPTY_COMPLETION.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and answers with a canned result.
    struct RecordingBackend {
        calls: Mutex<Vec<CompletionRequest>>,
        reply: Option<String>,
        fail: bool,
    }

    impl RecordingBackend {
        fn replying(reply: Option<&str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: reply.map(str::to_string),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply: None,
                fail: true,
            }
        }

        fn invocations(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<Option<String>, CompletionError> {
            self.calls.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(CompletionError::Api {
                    code: 503,
                    message: "overloaded".to_string(),
                });
            }
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    fn body(value: serde_json::Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    fn valid_body() -> Vec<u8> {
        body(serde_json::json!({
            "messages": [
                { "role": "assistant", "content": "Hi" },
                { "role": "user", "content": "What's next?" }
            ],
            "state": {}
        }))
    }

    #[tokio::test]
    async fn test_success_forwards_instruction_and_turns() {
        let backend = RecordingBackend::replying(Some("Call Acme at 10."));
        let reply = run_agent(Some(&backend), &chrono_tz::UTC, &valid_body())
            .await
            .unwrap();

        assert_eq!(reply, "Call Acme at 10.");
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].system.starts_with("You are CallFlow"));
        assert!(calls[0].system.contains("No calls on the board."));
        assert_eq!(calls[0].messages.len(), 2);
        assert_eq!(calls[0].messages[1].content, "What's next?");
    }

    #[tokio::test]
    async fn test_empty_completion_uses_fallback_reply() {
        let backend = RecordingBackend::replying(None);
        let reply = run_agent(Some(&backend), &chrono_tz::UTC, &valid_body())
            .await
            .unwrap();
        assert_eq!(reply, EMPTY_COMPLETION);
        assert!(!reply.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_backend() {
        let backend = RecordingBackend::replying(Some("unused"));
        for bad in [
            body(serde_json::json!({ "state": {} })),
            body(serde_json::json!({ "messages": [], "state": {} })),
            b"not json".to_vec(),
        ] {
            let err = run_agent(Some(&backend), &chrono_tz::UTC, &bad)
                .await
                .unwrap_err();
            assert!(matches!(err, ProxyError::Validation(_)));
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.public_message(), INVALID_PAYLOAD);
        }
        assert_eq!(backend.invocations(), 0);
    }

    #[tokio::test]
    async fn test_missing_backend_is_configuration_error() {
        let err = run_agent(None, &chrono_tz::UTC, &valid_body())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Configuration));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_body_without_backend_is_still_validation() {
        let err = run_agent(None, &chrono_tz::UTC, b"{}").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_single_attempt_502() {
        let backend = RecordingBackend::failing();
        let err = run_agent(Some(&backend), &chrono_tz::UTC, &valid_body())
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), UPSTREAM_UNAVAILABLE);
        assert!(!err.public_message().contains("overloaded"));
        assert_eq!(backend.invocations(), 1);
    }
}
