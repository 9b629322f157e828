use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskCategory {
    #[serde(rename = "Follow-up")]
    FollowUp,
    Preparation,
    Insights,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::FollowUp => "Follow-up",
            TaskCategory::Preparation => "Preparation",
            TaskCategory::Insights => "Insights",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub due: String,
    pub owner: String,
    pub category: TaskCategory,
    pub completed: bool,
}
