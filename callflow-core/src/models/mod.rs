pub mod call;
pub mod message;
pub mod snapshot;
pub mod task;

pub use call::{CallRecord, CallStatus, Priority, Sentiment};
pub use message::{AgentMessage, Role};
pub use snapshot::BoardStateSnapshot;
pub use task::{TaskCategory, TaskItem};
