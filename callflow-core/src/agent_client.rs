//! Client side of the agent contract.
//!
//! [`AgentClient`] talks HTTP to a CallFlow server. [`ChatSession`] drives a
//! conversation over a [`BoardStore`]: it appends turns to the transcript,
//! ships the transcript plus a fresh snapshot, and merges the reply back.
//! Transport failures never touch board state; they become a synthetic
//! assistant message instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{AgentReply, AgentRequest, ChatTurn};
use crate::board::BoardStore;
use crate::models::{AgentMessage, BoardStateSnapshot, Role};

pub const UNPARSEABLE_REPLY: &str = "I wasn't able to parse a response, but your call data is intact. Try again or adjust the request.";
pub const TRANSPORT_FAILURE: &str =
    "I hit an issue reaching the intelligence engine. Double-check the API key and try again.";

#[derive(Error, Debug)]
pub enum AgentClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("A request is already in flight")]
    Busy,
}

// ============================================================================
// AgentClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AgentClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST one request to `/api/agent`. Any non-2xx status is an error.
    pub async fn ask(&self, request: &AgentRequest) -> Result<AgentReply, AgentClientError> {
        let url = format!("{}/api/agent", self.base_url);
        let resp = self.client.post(&url).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<AgentReply>().await?)
    }

    /// GET `/health` and return the JSON body.
    pub async fn health(&self) -> Result<serde_json::Value, AgentClientError> {
        let url = format!("{}/health", self.base_url);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }
}

// ============================================================================
// ChatSession
// ============================================================================

/// Conversation driver for one board.
///
/// Only one request may be outstanding per session; `thinking` gates sends
/// and a second send while it is set fails with [`AgentClientError::Busy`].
#[derive(Debug)]
pub struct ChatSession {
    client: AgentClient,
    thinking: AtomicBool,
}

impl ChatSession {
    pub fn new(client: AgentClient) -> Self {
        Self {
            client,
            thinking: AtomicBool::new(false),
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking.load(Ordering::Acquire)
    }

    /// Send `input` as a user turn and append the assistant's answer.
    ///
    /// Returns the appended assistant message, or `None` for blank input.
    /// Transport failures are reported in the transcript, not as `Err`.
    pub async fn send_message(
        &self,
        store: &mut BoardStore,
        input: &str,
    ) -> Result<Option<AgentMessage>, AgentClientError> {
        let content = input.trim();
        if content.is_empty() {
            return Ok(None);
        }
        let guard = InFlight::enter(&self.thinking)?;

        store.append_message(AgentMessage::new(
            format!("user-{}", Uuid::new_v4()),
            Role::User,
            content,
        ));

        let request = AgentRequest::from_transcript(store.messages(), store.snapshot());

        let result = self.client.ask(&request).await;
        drop(guard);

        let message = match result {
            Ok(AgentReply { reply }) => AgentMessage::new(
                format!("assistant-{}", Uuid::new_v4()),
                Role::Assistant,
                reply.unwrap_or_else(|| UNPARSEABLE_REPLY.to_string()),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Agent request failed");
                AgentMessage::new(
                    format!("assistant-error-{}", Uuid::new_v4()),
                    Role::Assistant,
                    TRANSPORT_FAILURE,
                )
            }
        };

        store.append_message(message.clone());
        Ok(Some(message))
    }

    /// Ask for a call brief on the selected call and write it into its notes.
    ///
    /// Returns the new notes, or `None` when nothing is selected or the
    /// request failed. The brief is not added to the transcript.
    pub async fn regenerate_brief(
        &self,
        store: &mut BoardStore,
    ) -> Result<Option<String>, AgentClientError> {
        let selected = match store.selected_call() {
            Some(call) => call.clone(),
            None => return Ok(None),
        };
        let guard = InFlight::enter(&self.thinking)?;

        let prompt = brief_prompt(&selected.contact, &selected.company, &selected.focus);
        let request = AgentRequest {
            messages: vec![ChatTurn {
                role: Role::User,
                content: prompt,
            }],
            state: BoardStateSnapshot {
                calls: Some(vec![selected.clone()]),
                tasks: Some(store.tasks().to_vec()),
                selected_call_id: Some(selected.id.clone()),
            },
        };

        let result = self.client.ask(&request).await;
        drop(guard);

        match result {
            Ok(AgentReply { reply }) => {
                let notes = reply.unwrap_or_else(|| selected.notes.clone());
                store.update_notes(&selected.id, notes.clone());
                Ok(Some(notes))
            }
            Err(e) => {
                tracing::error!(error = %e, call_id = %selected.id, "Call brief generation failed");
                Ok(None)
            }
        }
    }
}

/// Holds the `thinking` flag for the duration of one request, clearing it
/// even if the request future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Result<Self, AgentClientError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AgentClientError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub fn brief_prompt(contact: &str, company: &str, focus: &str) -> String {
    format!(
        "Generate a high-impact call brief for {contact} at {company}. \
         Focus on: {focus}. Highlight risk, opportunity, and next steps."
    )
}

// ============================================================================
// TESTS
// ============================================================================
