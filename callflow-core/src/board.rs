//! Board State Store
//!
//! Holds the calls, tasks, selected call, and chat transcript for one client
//! session. The store is owned by the application controller and mutated
//! through `&mut self` methods only; [`BoardStore::snapshot`] produces the
//! projection sent with every agent request.

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AgentMessage, BoardStateSnapshot, CallRecord, CallStatus, Priority, Role, Sentiment,
    TaskCategory, TaskItem,
};
use crate::time::{parse_local_timestamp, parse_timestamp, to_iso};

pub const GREETING: &str = "Hi, I'm CallFlow. I monitor your call queue, prep materials, and keep follow-ups on track. Select a call or tell me what you need.";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Fields collected by the new-call form.
#[derive(Debug, Clone)]
pub struct NewCallForm {
    pub contact: String,
    pub company: String,
    pub role: String,
    pub phone: String,
    /// Empty means "now".
    pub scheduled: String,
    pub priority: Priority,
    pub owner: String,
    pub focus: String,
}

impl Default for NewCallForm {
    fn default() -> Self {
        Self {
            contact: String::new(),
            company: String::new(),
            role: String::new(),
            phone: String::new(),
            scheduled: String::new(),
            priority: Priority::Medium,
            owner: String::new(),
            focus: String::new(),
        }
    }
}

impl NewCallForm {
    fn validate(&self) -> Result<(), BoardError> {
        let required = [
            ("contact", &self.contact),
            ("company", &self.company),
            ("role", &self.role),
            ("phone", &self.phone),
            ("owner", &self.owner),
            ("focus", &self.focus),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BoardError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// Headline counts shown above the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardStats {
    pub total_calls: usize,
    pub scheduled_count: usize,
    pub follow_up_count: usize,
    pub high_priority_count: usize,
    pub escalations: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    calls: Vec<CallRecord>,
    tasks: Vec<TaskItem>,
    selected_call_id: Option<String>,
    messages: Vec<AgentMessage>,
}

impl BoardStore {
    pub fn new(calls: Vec<CallRecord>, tasks: Vec<TaskItem>) -> Self {
        let selected_call_id = calls.first().map(|c| c.id.clone());
        Self {
            calls,
            tasks,
            selected_call_id,
            messages: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    pub fn tasks(&self) -> &[TaskItem] {
        &self.tasks
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn selected_call_id(&self) -> Option<&str> {
        self.selected_call_id.as_deref()
    }

    pub fn selected_call(&self) -> Option<&CallRecord> {
        let id = self.selected_call_id.as_deref()?;
        self.calls.iter().find(|c| c.id == id)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add a call from the form. A naive `scheduled` value is wall-clock
    /// time in `tz`.
    pub fn add_call<Tz: TimeZone>(
        &mut self,
        form: NewCallForm,
        tz: &Tz,
    ) -> Result<CallRecord, BoardError> {
        self.add_call_at(form, Utc::now(), tz)
    }

    /// Same as [`add_call`](Self::add_call) with an explicit "now" for the
    /// empty-schedule case.
    pub fn add_call_at<Tz: TimeZone>(
        &mut self,
        form: NewCallForm,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<CallRecord, BoardError> {
        form.validate()?;

        let scheduled = if form.scheduled.trim().is_empty() {
            now
        } else {
            parse_local_timestamp(&form.scheduled, tz)
                .ok_or_else(|| BoardError::InvalidTimestamp(form.scheduled.clone()))?
        };

        let mut id = Uuid::new_v4().to_string();
        while self.calls.iter().any(|c| c.id == id) {
            id = Uuid::new_v4().to_string();
        }

        let entry = CallRecord {
            id: id.clone(),
            contact: form.contact,
            company: form.company,
            role: form.role,
            phone: form.phone,
            scheduled: to_iso(&scheduled),
            priority: form.priority,
            status: CallStatus::Scheduled,
            owner: form.owner,
            focus: form.focus,
            notes: String::new(),
            last_outcome: None,
            next_action: Some(String::new()),
            sentiment: None,
            tags: None,
        };

        self.calls.insert(0, entry.clone());
        self.selected_call_id = Some(id);
        tracing::debug!(call_id = %entry.id, company = %entry.company, "Call added");
        Ok(entry)
    }

    /// Set a call's status. Marking a call `Completed` also marks its
    /// sentiment `Positive`, whatever it was before.
    pub fn update_status(&mut self, id: &str, status: CallStatus) {
        if let Some(call) = self.call_mut(id) {
            call.status = status;
            if status == CallStatus::Completed {
                call.sentiment = Some(Sentiment::Positive);
            }
        }
    }

    pub fn update_notes(&mut self, id: &str, notes: impl Into<String>) {
        if let Some(call) = self.call_mut(id) {
            call.notes = notes.into();
        }
    }

    pub fn update_next_action(&mut self, id: &str, next_action: impl Into<String>) {
        if let Some(call) = self.call_mut(id) {
            call.next_action = Some(next_action.into());
        }
    }

    pub fn toggle_task_completion(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
        }
    }

    /// Select a call. The id is not checked; an unknown id simply resolves to
    /// no selection downstream.
    pub fn select_call(&mut self, id: impl Into<String>) {
        self.selected_call_id = Some(id.into());
    }

    pub fn append_message(&mut self, message: AgentMessage) {
        self.messages.push(message);
    }

    fn call_mut(&mut self, id: &str) -> Option<&mut CallRecord> {
        self.calls.iter_mut().find(|c| c.id == id)
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> BoardStateSnapshot {
        BoardStateSnapshot {
            calls: Some(self.calls.clone()),
            tasks: Some(self.tasks.clone()),
            selected_call_id: self.selected_call_id.clone(),
        }
    }

    /// Calls in ascending scheduled order; unparseable times go last.
    pub fn sorted_calls(&self) -> Vec<&CallRecord> {
        let mut sorted: Vec<&CallRecord> = self.calls.iter().collect();
        sorted.sort_by_key(|c| match parse_timestamp(&c.scheduled) {
            Some(dt) => (0, dt),
            None => (1, DateTime::<Utc>::MIN_UTC),
        });
        sorted
    }

    pub fn stats(&self) -> BoardStats {
        let count = |pred: &dyn Fn(&CallRecord) -> bool| self.calls.iter().filter(|c| pred(c)).count();
        BoardStats {
            total_calls: self.calls.len(),
            scheduled_count: count(&|c| c.status == CallStatus::Scheduled),
            follow_up_count: count(&|c| c.status == CallStatus::NeedsFollowUp),
            high_priority_count: count(&|c| c.priority == Priority::High),
            escalations: count(&|c| c.sentiment == Some(Sentiment::Negative)),
        }
    }

    /// The earliest still-scheduled call at or after `now`.
    pub fn next_call(&self, now: DateTime<Utc>) -> Option<&CallRecord> {
        self.calls
            .iter()
            .filter(|c| c.status == CallStatus::Scheduled)
            .filter_map(|c| parse_timestamp(&c.scheduled).map(|dt| (dt, c)))
            .filter(|(dt, _)| *dt >= now)
            .min_by_key(|(dt, _)| *dt)
            .map(|(_, c)| c)
    }

    // ------------------------------------------------------------------
    // Demo board
    // ------------------------------------------------------------------

    /// The board the dashboard opens with: three calls and three prep tasks
    /// laid out around midnight of `now`'s day in `now`'s timezone.
    pub fn demo<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| now.with_timezone(&Utc));
        let at = |hours: i64| to_iso(&(midnight + Duration::hours(hours)));

        let calls = vec![
            CallRecord {
                id: "call-1".to_string(),
                contact: "Jordan Smith".to_string(),
                company: "Acme Logistics".to_string(),
                role: "Operations Director".to_string(),
                phone: "+1 (312) 555-9021".to_string(),
                scheduled: at(10),
                priority: Priority::High,
                status: CallStatus::Scheduled,
                owner: "Taylor".to_string(),
                focus: "Renew enterprise contract and uncover expansion opportunity".to_string(),
                notes: "Customer flagged missed SLAs last week; prep updated fulfillment report."
                    .to_string(),
                last_outcome: None,
                next_action: Some("Present revised SLA dashboard and map upgrade path.".to_string()),
                sentiment: None,
                tags: Some(vec!["Renewal".to_string(), "At-Risk".to_string()]),
            },
            CallRecord {
                id: "call-2".to_string(),
                contact: "Mei Chen".to_string(),
                company: "Brightside Health".to_string(),
                role: "Head of Patient Ops".to_string(),
                phone: "+1 (415) 555-7322".to_string(),
                scheduled: at(13),
                priority: Priority::Medium,
                status: CallStatus::Scheduled,
                owner: "Alex".to_string(),
                focus: "Walk through pilot analytics and align on rollout timeline".to_string(),
                notes: "They need patient engagement benchmarks before expanding.".to_string(),
                last_outcome: Some(
                    "Requested comparative metrics vs Q1 baseline to share with COO.".to_string(),
                ),
                next_action: Some(
                    "Compile engagement benchmarks and flag likely blockers to rollout."
                        .to_string(),
                ),
                sentiment: None,
                tags: Some(vec!["Pilot".to_string(), "Analytics".to_string()]),
            },
            CallRecord {
                id: "call-3".to_string(),
                contact: "Luis Ramirez".to_string(),
                company: "Northwind Holdings".to_string(),
                role: "Portfolio Manager".to_string(),
                phone: "+1 (917) 555-1844".to_string(),
                scheduled: at(-3),
                priority: Priority::High,
                status: CallStatus::NeedsFollowUp,
                owner: "Jordan".to_string(),
                focus: "Resolve billing dispute on overage fees".to_string(),
                notes: "Send revised invoice and capture approval; identify root cause of overage."
                    .to_string(),
                last_outcome: Some(
                    "Call ended with action to deliver updated billing detail within 4hrs."
                        .to_string(),
                ),
                next_action: Some(
                    "Escalate to finance for credit approval and draft apology email.".to_string(),
                ),
                sentiment: Some(Sentiment::Negative),
                tags: Some(vec!["Billing".to_string(), "Escalation".to_string()]),
            },
        ];

        let tasks = vec![
            TaskItem {
                id: "task-1".to_string(),
                title: "Finalize SLA recovery deck for Acme Logistics".to_string(),
                due: at(8),
                owner: "Taylor".to_string(),
                category: TaskCategory::Preparation,
                completed: false,
            },
            TaskItem {
                id: "task-2".to_string(),
                title: "Compile engagement benchmarks for Brightside pilot".to_string(),
                due: at(12),
                owner: "Alex".to_string(),
                category: TaskCategory::Insights,
                completed: false,
            },
            TaskItem {
                id: "task-3".to_string(),
                title: "Send revised invoice to Northwind finance team".to_string(),
                due: at(2),
                owner: "Jordan".to_string(),
                category: TaskCategory::FollowUp,
                completed: false,
            },
        ];

        let mut store = Self::new(calls, tasks);
        store.append_message(AgentMessage::new("assistant-initial", Role::Assistant, GREETING));
        store
    }
}
