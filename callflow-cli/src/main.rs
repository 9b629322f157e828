//! callflow — interactive call board and chat client for the CallFlow agent API
//!
//! Owns a [`BoardStore`] seeded with the demo board and drives it from a
//! readline loop. Plain lines go to the agent together with a snapshot of the
//! board; slash-commands edit the board locally.
//!
//! # Subcommands
//! - `chat`            — interactive REPL (default)
//! - `ask <message>`   — one-shot question against the demo board
//! - `status`          — show server health

use std::time::Duration;

use callflow_core::agent_client::{AgentClient, ChatSession};
use callflow_core::board::{BoardStore, NewCallForm};
use callflow_core::config::parse_tz;
use callflow_core::models::{CallRecord, CallStatus, Priority, TaskItem};
use callflow_core::time::format_display;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const REQUEST_TIMEOUT_SECS: u64 = 90;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "callflow",
    version,
    about = "CallFlow — call board and operations assistant"
)]
struct Cli {
    /// CallFlow HTTP server URL (overrides CALLFLOW_URL env var)
    #[arg(long, env = "CALLFLOW_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// IANA timezone for board times and the demo day
    #[arg(long, env = "CALLFLOW_TIMEZONE", default_value = "UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive call board and chat
    Chat,

    /// Ask the agent a single question about the demo board
    Ask {
        /// Message to send
        message: String,
    },

    /// Show CallFlow server status
    Status,
}

// ============================================================================
// REPL commands
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Calls,
    Tasks,
    Stats,
    Select(String),
    Status(String, CallStatus),
    Notes(String, String),
    Next(String, String),
    Toggle(String),
    Add,
    Brief,
    Help,
    Exit,
    Say(String),
}

fn parse_status(s: &str) -> Option<CallStatus> {
    match s.to_ascii_lowercase().as_str() {
        "scheduled" => Some(CallStatus::Scheduled),
        "completed" | "done" => Some(CallStatus::Completed),
        "follow-up" | "followup" | "needs-follow-up" => Some(CallStatus::NeedsFollowUp),
        _ => None,
    }
}

fn parse_priority(s: &str) -> Option<Priority> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "medium" | "m" => Some(Priority::Medium),
        "high" | "h" => Some(Priority::High),
        "low" | "l" => Some(Priority::Low),
        _ => None,
    }
}

/// Parse one REPL line. Lines that do not start with `/` are chat messages.
fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(ReplCommand::Say(line.to_string()));
    }

    let mut parts = line.splitn(3, ' ');
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let rest = parts.next().map(str::trim).unwrap_or_default().to_string();

    let need_id = |usage: &str| arg.map(str::to_string).ok_or_else(|| format!("usage: {usage}"));

    match cmd {
        "/calls" => Ok(ReplCommand::Calls),
        "/tasks" => Ok(ReplCommand::Tasks),
        "/stats" => Ok(ReplCommand::Stats),
        "/add" => Ok(ReplCommand::Add),
        "/brief" => Ok(ReplCommand::Brief),
        "/help" => Ok(ReplCommand::Help),
        "/exit" | "/quit" => Ok(ReplCommand::Exit),
        "/select" => Ok(ReplCommand::Select(need_id("/select <call-id>")?)),
        "/toggle" => Ok(ReplCommand::Toggle(need_id("/toggle <task-id>")?)),
        "/notes" => Ok(ReplCommand::Notes(need_id("/notes <call-id> <text>")?, rest)),
        "/next" => Ok(ReplCommand::Next(need_id("/next <call-id> <text>")?, rest)),
        "/status" => {
            let id = need_id("/status <call-id> <scheduled|completed|follow-up>")?;
            let status = parse_status(&rest)
                .ok_or_else(|| format!("unknown status '{rest}' (scheduled|completed|follow-up)"))?;
            Ok(ReplCommand::Status(id, status))
        }
        other => Err(format!("unknown command {other}, try /help")),
    }
}

// ============================================================================
// Board formatting
// ============================================================================

fn format_call_row(call: &CallRecord, tz: &Tz, selected: bool) -> String {
    let marker = if selected { '>' } else { ' ' };
    let sentiment = call
        .sentiment
        .map(|s| format!(" [{}]", s))
        .unwrap_or_default();
    format!(
        "{marker} {:<10} {:<18} {:<22} {:<16} {:<6} {}{}",
        call.id,
        format_display(&call.scheduled, tz),
        format!("{} ({})", call.contact, call.company),
        call.status,
        call.priority,
        call.owner,
        sentiment,
    )
}

fn format_task_row(task: &TaskItem, tz: &Tz) -> String {
    format!(
        "[{}] {:<8} {} — {} · {} · due {}",
        if task.completed { 'x' } else { ' ' },
        task.id,
        task.title,
        task.category,
        task.owner,
        format_display(&task.due, tz),
    )
}

fn print_board(store: &BoardStore, tz: &Tz) {
    let selected = store.selected_call_id();
    for call in store.sorted_calls() {
        println!("{}", format_call_row(call, tz, Some(call.id.as_str()) == selected));
    }
    if let Some(call) = store.selected_call() {
        println!();
        println!("Focus:       {}", call.focus);
        println!("Next action: {}", call.next_action.as_deref().unwrap_or("-"));
        println!("Notes:       {}", call.notes);
    }
}

fn print_tasks(store: &BoardStore, tz: &Tz) {
    if store.tasks().is_empty() {
        println!("No tasks logged.");
    }
    for task in store.tasks() {
        println!("{}", format_task_row(task, tz));
    }
}

fn print_stats(store: &BoardStore, tz: &Tz) {
    let stats = store.stats();
    let next = store
        .next_call(chrono::Utc::now())
        .map(|c| format!("{} • {}", c.contact, format_display(&c.scheduled, tz)))
        .unwrap_or_else(|| "No upcoming calls".to_string());
    println!("Calls:         {}", stats.total_calls);
    println!("Scheduled:     {}", stats.scheduled_count);
    println!("Follow-ups:    {}", stats.follow_up_count);
    println!("High priority: {}", stats.high_priority_count);
    println!("Escalations:   {}", stats.escalations);
    println!("Next call:     {}", next);
}

const HELP: &str = "\
Type a message to ask the assistant, or use a command:
  /calls                     show the board (sorted by time, > marks selection)
  /tasks                     show the task list
  /stats                     headline counts and next call
  /select <call-id>          focus the assistant on a call
  /status <call-id> <s>      scheduled | completed | follow-up
  /notes <call-id> <text>    replace call notes
  /next <call-id> <text>     replace next action
  /toggle <task-id>          mark a task done / open
  /add                       add a new call
  /brief                     generate a call brief into the selected call's notes
  /exit                      quit";

// ============================================================================
// Commands
// ============================================================================

fn prompt_form(rl: &mut DefaultEditor) -> anyhow::Result<NewCallForm> {
    let mut ask = |label: &str| -> anyhow::Result<String> { Ok(rl.readline(&format!("  {label}: "))?) };

    let contact = ask("Contact")?;
    let company = ask("Company")?;
    let role = ask("Role")?;
    let phone = ask("Phone")?;
    let scheduled = ask("Scheduled (YYYY-MM-DDTHH:MM, blank = now)")?;
    let priority_raw = ask("Priority (high/medium/low)")?;
    let owner = ask("Owner")?;
    let focus = ask("Focus")?;

    let priority = parse_priority(&priority_raw)
        .ok_or_else(|| anyhow::anyhow!("unknown priority '{}'", priority_raw.trim()))?;

    Ok(NewCallForm {
        contact,
        company,
        role,
        phone,
        scheduled,
        priority,
        owner,
        focus,
    })
}

async fn run_chat(client: AgentClient, tz: Tz) -> anyhow::Result<()> {
    let mut store = BoardStore::demo(&chrono::Utc::now().with_timezone(&tz));
    let chat = ChatSession::new(client);
    let mut rl = DefaultEditor::new()?;

    for message in store.messages() {
        println!("callflow> {}", message.content);
    }
    eprintln!("Type /help for commands, Ctrl+D to exit");

    loop {
        let line = match rl.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str()).ok();

        let command = match parse_line(&line) {
            Ok(c) => c,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        match command {
            ReplCommand::Calls => print_board(&store, &tz),
            ReplCommand::Tasks => print_tasks(&store, &tz),
            ReplCommand::Stats => print_stats(&store, &tz),
            ReplCommand::Select(id) => {
                store.select_call(id);
                if store.selected_call().is_none() {
                    eprintln!("(no call with that id; the assistant will see no selection)");
                }
            }
            ReplCommand::Status(id, status) => store.update_status(&id, status),
            ReplCommand::Notes(id, text) => store.update_notes(&id, text),
            ReplCommand::Next(id, text) => store.update_next_action(&id, text),
            ReplCommand::Toggle(id) => store.toggle_task_completion(&id),
            ReplCommand::Add => match prompt_form(&mut rl) {
                Ok(form) => match store.add_call(form, &tz) {
                    Ok(call) => println!("Added {} ({}) as {}", call.contact, call.company, call.id),
                    Err(e) => eprintln!("{e}"),
                },
                Err(e) => eprintln!("{e}"),
            },
            ReplCommand::Brief => match chat.regenerate_brief(&mut store).await {
                Ok(Some(notes)) => println!("{notes}"),
                Ok(None) => eprintln!("(no brief: select a call first, or the agent was unreachable)"),
                Err(e) => eprintln!("{e}"),
            },
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Exit => break,
            ReplCommand::Say(text) => match chat.send_message(&mut store, &text).await {
                Ok(Some(reply)) => println!("callflow> {}", reply.content),
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            },
        }
    }

    Ok(())
}

async fn run_ask(client: AgentClient, tz: Tz, message: &str) -> anyhow::Result<()> {
    let mut store = BoardStore::demo(&chrono::Utc::now().with_timezone(&tz));
    let chat = ChatSession::new(client);
    if let Some(reply) = chat.send_message(&mut store, message).await? {
        println!("{}", reply.content);
    }
    Ok(())
}

async fn run_status(client: AgentClient) -> anyhow::Result<()> {
    match client.health().await {
        Ok(body) => {
            println!("CallFlow server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!(
                "Completion:      {}",
                if body["completion_configured"].as_bool().unwrap_or(false) {
                    body["model"].as_str().unwrap_or("configured")
                } else {
                    "not configured (OPENAI_API_KEY missing)"
                }
            );
        }
        Err(e) => {
            eprintln!("callflow: cannot reach {} — {}", client.base_url(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let tz = parse_tz(&cli.timezone);

    let client = match AgentClient::new(&cli.server, Duration::from_secs(REQUEST_TIMEOUT_SECS)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("callflow: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(client, tz).await,
        Commands::Ask { message } => run_ask(client, tz, &message).await,
        Commands::Status => run_status(client).await,
    };

    if let Err(e) = result {
        eprintln!("callflow: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
