pub mod agent_client;
pub mod api;
pub mod board;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod time;

pub use agent_client::{AgentClient, AgentClientError, ChatSession};
pub use api::{AgentReply, AgentRequest, ChatTurn, ErrorBody};
pub use board::{BoardError, BoardStats, BoardStore, NewCallForm};
pub use completion::{
    CompletionBackend, CompletionError, CompletionRequest, OpenAiCompletionClient,
};
pub use config::CallflowConfig;
pub use context::{build_system_instruction, render_context};
pub use error::CallflowError;
