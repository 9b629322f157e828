//! Completion module — client for the hosted chat-completion model
//!
//! Provides a `CompletionBackend` trait so the agent endpoint can be driven by
//! the OpenAI-compatible HTTP client in production and by recording mocks in
//! tests. Every call is a single attempt: no retry, no streaming.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ChatTurn;
use crate::config::CompletionConfig;
use crate::models::Role;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// System instruction plus the ordered conversation, ready to forward.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion. `Ok(None)` means the model answered without any
    /// usable content.
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, CompletionError>;

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Model identifier reported by `/health`.
    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: Option<OpenAiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Assistant => "assistant",
        Role::User => "user",
    }
}

// ============================================================================
// OpenAiCompletionClient
// ============================================================================

/// Chat-completions client for OpenAI and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_key: String,
    config: CompletionConfig,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: impl Into<String>, config: CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Build a client from `OPENAI_API_KEY`. Returns `None` when the variable
    /// is unset or empty.
    pub fn from_env(config: CompletionConfig) -> Result<Option<Self>, CompletionError> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self::new(key.trim(), config).map(Some),
            _ => Ok(None),
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<Option<String>, CompletionError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &request.system,
        });
        messages.extend(request.messages.iter().map(|turn| WireMessage {
            role: role_str(turn.role),
            content: &turn.content,
        }));

        let body = ChatCompletionRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(text);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty()))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, CompletionError> {
        self.complete_once(request).await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// TESTS
// ============================================================================
