//! Wire types for `POST /api/agent`.
//!
//! The request schema is expressed entirely through these serde types: enum
//! literals, required fields and optional sections are enforced on
//! deserialization, and [`AgentRequest::validate`] adds the one rule serde
//! cannot express (at least one message).

use serde::{Deserialize, Serialize};

use crate::models::{AgentMessage, BoardStateSnapshot, Role};

/// Body returned with every 400 response.
pub const INVALID_PAYLOAD: &str = "Invalid payload for call agent.";
/// Body returned when no completion credential is configured.
pub const MISSING_API_KEY: &str = "OpenAI API key is missing from the environment.";
/// Body returned when the completion model could not be reached.
pub const UPSTREAM_UNAVAILABLE: &str =
    "Unable to reach the intelligence engine right now. Try again shortly.";
/// Reply used when the model answers without any content.
pub const EMPTY_COMPLETION: &str = "No response generated. Re-run your last request.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl From<&AgentMessage> for ChatTurn {
    fn from(message: &AgentMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub messages: Vec<ChatTurn>,
    pub state: BoardStateSnapshot,
}

impl AgentRequest {
    pub fn from_transcript(messages: &[AgentMessage], state: BoardStateSnapshot) -> Self {
        Self {
            messages: messages.iter().map(ChatTurn::from).collect(),
            state,
        }
    }

    /// Parse and validate a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        let request: Self = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.messages.is_empty() {
            return Err("messages: expected at least 1 entry".to_string());
        }
        Ok(())
    }
}

/// Success body. `reply` is absent on a malformed success so the client can
/// fall back instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
