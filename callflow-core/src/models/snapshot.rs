use serde::{Deserialize, Serialize};

use super::{CallRecord, TaskItem};

/// Read-only projection of the board sent with every agent request.
///
/// On the way in every field is optional; absent collections are treated as
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls: Option<Vec<CallRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_call_id: Option<String>,
}

impl BoardStateSnapshot {
    pub fn calls(&self) -> &[CallRecord] {
        self.calls.as_deref().unwrap_or(&[])
    }

    pub fn tasks(&self) -> &[TaskItem] {
        self.tasks.as_deref().unwrap_or(&[])
    }

    /// Resolve `selected_call_id` against `calls`.
    pub fn selected_call(&self) -> Option<&CallRecord> {
        let id = self.selected_call_id.as_deref()?;
        self.calls().iter().find(|call| call.id == id)
    }
}
