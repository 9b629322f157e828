//! Context rendering
//!
//! Turns a [`BoardStateSnapshot`] into the plain-text digest appended to the
//! assistant persona. Rendering is a pure function of the snapshot and the
//! display timezone: the same input always yields byte-identical output.

use chrono_tz::Tz;

use crate::models::{BoardStateSnapshot, CallRecord, TaskItem};
use crate::time::format_display;

pub const SYSTEM_PROMPT: &str = "\
You are CallFlow, an elite business call operations AI.
You orchestrate complex customer conversations, mitigate risk, unlock expansion opportunities, and write editorial-quality follow-ups.

Operating principles:
- Prioritise call outcomes, measurable next actions, and strategic guidance.
- Be concise yet actionable; use bullets and headings when it improves readability.
- Keep tone calm, confident, and revenue-focused.
- When asked for emails or scripts, provide fully drafted artifacts with subject lines.
- Reference call owners, customers, and timelines pulled from the call state.
- If information is missing, state the assumption and proceed.";

pub const NO_CALLS: &str = "No calls on the board.";
pub const NO_TASKS: &str = "No tasks logged.";
pub const NO_SELECTION: &str = "No call currently selected.";
pub const NEXT_ACTION_PLACEHOLDER: &str = "Not captured yet.";

pub fn render_context(state: &BoardStateSnapshot, tz: &Tz) -> String {
    let calls = state.calls();
    let queue = if calls.is_empty() {
        NO_CALLS.to_string()
    } else {
        calls
            .iter()
            .map(|call| render_call_line(call, tz))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tasks = state.tasks();
    let task_summary = if tasks.is_empty() {
        NO_TASKS.to_string()
    } else {
        tasks
            .iter()
            .map(|task| render_task_line(task, tz))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let lens = match state.selected_call() {
        Some(call) => render_lens(call),
        None => NO_SELECTION.to_string(),
    };

    format!("Current queue:\n{queue}\n\nTasks:\n{task_summary}\n\nActive lens:\n{lens}")
}

/// Persona directive followed by the rendered board context.
pub fn build_system_instruction(state: &BoardStateSnapshot, tz: &Tz) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT, render_context(state, tz))
}

fn render_call_line(call: &CallRecord, tz: &Tz) -> String {
    format!(
        "• {} ({}) — {}, priority {}. Owner {}. Focus: {}. Time {}.",
        call.contact,
        call.company,
        call.status,
        call.priority,
        call.owner,
        call.focus,
        format_display(&call.scheduled, tz),
    )
}

fn render_task_line(task: &TaskItem, tz: &Tz) -> String {
    format!(
        "• {} — {} owned by {}, due {}, {}.",
        task.title,
        task.category,
        task.owner,
        format_display(&task.due, tz),
        if task.completed { "completed" } else { "open" },
    )
}

fn render_lens(call: &CallRecord) -> String {
    let next_action = call
        .next_action
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(NEXT_ACTION_PLACEHOLDER);
    format!(
        "Focus on {} ({}). Objective: {}. Next action: {}.",
        call.contact, call.company, call.focus, next_action
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallStatus, Priority, Sentiment, TaskCategory};

    fn call(id: &str, next_action: Option<&str>) -> CallRecord {
        CallRecord {
            id: id.to_string(),
            contact: "Jordan Smith".to_string(),
            company: "Acme Logistics".to_string(),
            role: "Operations Director".to_string(),
            phone: "+1 (312) 555-9021".to_string(),
            scheduled: "2024-01-01T10:00:00.000Z".to_string(),
            priority: Priority::High,
            status: CallStatus::NeedsFollowUp,
            owner: "Taylor".to_string(),
            focus: "Renew contract".to_string(),
            notes: String::new(),
            last_outcome: None,
            next_action: next_action.map(str::to_string),
            sentiment: Some(Sentiment::Neutral),
            tags: None,
        }
    }

    fn task(completed: bool) -> TaskItem {
        TaskItem {
            id: "task-1".to_string(),
            title: "Send invoice".to_string(),
            due: "2024-01-01T14:30:00Z".to_string(),
            owner: "Alex".to_string(),
            category: TaskCategory::FollowUp,
            completed,
        }
    }

    #[test]
    fn test_empty_state_uses_all_placeholders() {
        let text = render_context(&BoardStateSnapshot::default(), &chrono_tz::UTC);
        assert_eq!(
            text,
            "Current queue:\nNo calls on the board.\n\nTasks:\nNo tasks logged.\n\nActive lens:\nNo call currently selected."
        );
    }

    #[test]
    fn test_empty_tasks_vec_same_as_absent() {
        let state = BoardStateSnapshot {
            calls: None,
            tasks: Some(Vec::new()),
            selected_call_id: None,
        };
        assert!(render_context(&state, &chrono_tz::UTC).contains(NO_TASKS));
    }

    #[test]
    fn test_full_render() {
        let state = BoardStateSnapshot {
            calls: Some(vec![call("call-1", Some("Send SLA deck"))]),
            tasks: Some(vec![task(false), task(true)]),
            selected_call_id: Some("call-1".to_string()),
        };

        let text = render_context(&state, &chrono_tz::UTC);
        let expected = "Current queue:\n\
• Jordan Smith (Acme Logistics) — Needs Follow-up, priority High. Owner Taylor. Focus: Renew contract. Time Jan 1, 10:00 AM.\n\
\n\
Tasks:\n\
• Send invoice — Follow-up owned by Alex, due Jan 1, 2:30 PM, open.\n\
• Send invoice — Follow-up owned by Alex, due Jan 1, 2:30 PM, completed.\n\
\n\
Active lens:\n\
Focus on Jordan Smith (Acme Logistics). Objective: Renew contract. Next action: Send SLA deck.";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_unmatched_selection_reports_none_selected() {
        let state = BoardStateSnapshot {
            calls: Some(vec![call("call-1", None)]),
            tasks: None,
            selected_call_id: Some("call-2".to_string()),
        };
        let text = render_context(&state, &chrono_tz::UTC);
        assert!(text.ends_with("Active lens:\nNo call currently selected."));
        assert!(!text.contains(NO_CALLS));
    }

    #[test]
    fn test_missing_or_empty_next_action_uses_placeholder() {
        for next in [None, Some("")] {
            let state = BoardStateSnapshot {
                calls: Some(vec![call("call-1", next)]),
                tasks: None,
                selected_call_id: Some("call-1".to_string()),
            };
            let text = render_context(&state, &chrono_tz::UTC);
            assert!(text.ends_with("Next action: Not captured yet.."), "{text}");
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let state = BoardStateSnapshot {
            calls: Some(vec![call("call-1", None), call("call-2", Some("x"))]),
            tasks: Some(vec![task(true)]),
            selected_call_id: Some("call-2".to_string()),
        };
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        assert_eq!(render_context(&state, &tz), render_context(&state, &tz));
    }

    #[test]
    fn test_times_follow_display_timezone() {
        let state = BoardStateSnapshot {
            calls: Some(vec![call("call-1", None)]),
            tasks: None,
            selected_call_id: None,
        };
        let text = render_context(&state, &chrono_tz::Asia::Tokyo);
        assert!(text.contains("Time Jan 1, 7:00 PM."), "{text}");
    }

    #[test]
    fn test_system_instruction_starts_with_persona() {
        let instruction = build_system_instruction(&BoardStateSnapshot::default(), &chrono_tz::UTC);
        assert!(instruction.starts_with("You are CallFlow"));
        assert!(instruction.contains("subject lines"));
        assert!(instruction.contains("If information is missing, state the assumption and proceed.\n\nCurrent queue:"));
    }
}
