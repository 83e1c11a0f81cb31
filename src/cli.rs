use clap::{Parser, Subcommand};
use thiserror::Error;

use std::path::Path;

use crate::board::{DayBucket, MoveRequest, Section};
use crate::config::{Config, ConfigError};
use crate::models::{
    self, AlterEgo, Category, Chat, DecisionEntry, NoteCategory, Quadrant, Sender, StickyNote,
};
use crate::planner::{PlannerError, TaskBoard};
use crate::store::{Persistence, StoreError, SyncReport, SyncState};
use crate::utils::{Profile, format_day_label, parse_date, today};

#[derive(Parser)]
#[command(name = "dayboard")]
#[command(about = "Rolling 7-day task board, sticky notes, decisions and alter egos")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a task to the board
    AddTask {
        /// Task text
        text: String,
        /// work or personal
        #[arg(long, default_value = "personal")]
        category: Category,
        /// Board day, 0 = today
        #[arg(long, conflicts_with = "start")]
        day: Option<usize>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// Print the board
    Board {
        /// Emit the buckets as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a task completed (id or unique id prefix)
    Done { id: String },
    /// Move a task to another day and/or category
    Move {
        id: String,
        /// Target board day, 0 = today
        #[arg(long)]
        to_day: usize,
        /// Target category (defaults to the task's own)
        #[arg(long)]
        category: Option<Category>,
        /// Position inside the target section
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Delete a task
    DeleteTask { id: String },
    /// Add a sticky note
    AddNote {
        /// Note title
        title: String,
        /// Markdown content
        #[arg(long)]
        content: Option<String>,
        /// Note colour
        #[arg(long)]
        color: Option<String>,
        /// Category name, created when missing
        #[arg(long)]
        category: Option<String>,
    },
    /// List sticky notes
    Notes,
    /// Record a decision in the urgent/important matrix
    AddDecision {
        title: String,
        #[arg(long)]
        urgent: bool,
        #[arg(long)]
        important: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show the decision matrix
    Decisions,
    /// Create an alter ego
    AddAlterEgo {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Personality trait; repeat for several
        #[arg(long = "trait")]
        traits: Vec<String>,
    },
    /// List alter egos
    AlterEgos,
    /// Add a message to the latest chat with an alter ego
    Say {
        /// Alter ego id or unique id prefix
        alter_ego_id: String,
        text: String,
        /// Write in the alter ego's voice
        #[arg(long)]
        as_alter_ego: bool,
    },
    /// Push every local record to the remote store
    Sync,
    /// List themes, or switch to NAME
    Theme { name: Option<String> },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Planner(#[from] PlannerError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No {0} matches '{1}'")]
    NotFound(&'static str, String),
    #[error("'{1}' matches more than one {0}")]
    Ambiguous(&'static str, String),
    #[error("Text cannot be empty")]
    EmptyText,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn parse_date_arg(raw: &str) -> Result<chrono::NaiveDate, CliError> {
    parse_date(raw).map_err(|e| CliError::DateParseError(format!("Invalid date format '{}': {}", raw, e)))
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolve a full id or a unique prefix of one
fn resolve_id<'a, I>(kind: &'static str, wanted: &str, ids: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = wanted.trim();
    let mut matches = Vec::new();
    for id in ids {
        if id == wanted {
            return Ok(id.to_string());
        }
        if !wanted.is_empty() && id.starts_with(wanted) {
            matches.push(id.to_string());
        }
    }
    match matches.len() {
        0 => Err(CliError::NotFound(kind, wanted.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(CliError::Ambiguous(kind, wanted.to_string())),
    }
}

fn resolve_task(board: &TaskBoard, wanted: &str) -> Result<String, CliError> {
    resolve_id("task", wanted, board.tasks().iter().map(|t| t.id.as_str()))
}

/// Handle the add-task command
pub fn handle_add_task(
    board: &mut TaskBoard,
    text: String,
    category: Category,
    day: Option<usize>,
    start: Option<String>,
    due: Option<String>,
) -> Result<(), CliError> {
    let due = due.as_deref().map(parse_date_arg).transpose()?;
    let saved = match start {
        Some(start) => board.add_task_on(&text, category, parse_date_arg(&start)?, due)?,
        None => {
            let mut saved = board.add_task(&text, category, day)?;
            if due.is_some() {
                saved = board.set_due_date(&saved.record.id, due)?;
            }
            saved
        }
    };
    println!("Task created (ID: {}, {})", saved.record.id, saved.sync);
    Ok(())
}

fn task_marker(section: Section) -> &'static str {
    match section {
        Section::Overdue => "[!]",
        Section::Todo => "[ ]",
        Section::Completed => "[x]",
    }
}

fn print_bucket(bucket: &DayBucket, today: chrono::NaiveDate) {
    println!("{} ({})", format_day_label(bucket.date, today), bucket.date);
    if bucket.is_empty() {
        println!("  (nothing planned)");
        return;
    }
    for category in Category::ALL {
        let column = bucket.column(category);
        if column.is_empty() {
            continue;
        }
        println!("  {}", category);
        for (section, task) in column.entries() {
            let mut line = format!("    {} {} {}", task_marker(section), short_id(&task.id), task.text);
            if !task.subtasks.is_empty() {
                let (done, total) = task.subtask_progress();
                line.push_str(&format!(" ({}/{})", done, total));
            }
            if let Some(due) = task.due_date {
                line.push_str(&format!(" due {}", due));
            }
            println!("{}", line);
        }
    }
}

/// Handle the board command
pub fn handle_board(board: &TaskBoard, json: bool) -> Result<(), CliError> {
    if json {
        let days: Vec<serde_json::Value> = board
            .buckets()
            .iter()
            .map(|b| {
                serde_json::json!({
                    "date": b.date,
                    "isPast": b.is_past,
                    "overdue": b.overdue,
                    "todo": b.todo,
                    "completed": b.completed,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&days)?);
        return Ok(());
    }
    for bucket in board.buckets() {
        print_bucket(bucket, board.today());
    }
    Ok(())
}

/// Handle the done command
pub fn handle_done(board: &mut TaskBoard, id: String) -> Result<(), CliError> {
    let id = resolve_task(board, &id)?;
    let already_done = board.task(&id).is_some_and(|t| t.completed);
    if already_done {
        println!("Task {} is already completed", short_id(&id));
        return Ok(());
    }
    let saved = board.toggle_completion(&id)?;
    println!("Completed '{}' ({})", saved.record.text, saved.sync);
    Ok(())
}

/// Handle the move command
pub fn handle_move(
    board: &mut TaskBoard,
    id: String,
    to_day: usize,
    category: Option<Category>,
    index: usize,
) -> Result<(), CliError> {
    let id = resolve_task(board, &id)?;
    let from_category = board
        .task(&id)
        .map(|t| t.category)
        .ok_or_else(|| CliError::NotFound("task", id.clone()))?;
    let from_day = board
        .buckets()
        .iter()
        .position(|b| b.find(&id).is_some())
        .unwrap_or(0);

    let req = MoveRequest {
        task_id: id,
        from_day,
        to_day,
        from_category,
        to_category: category.unwrap_or(from_category),
        source_index: None,
        target_index: index,
    };
    let saved = board.move_task(&req, std::time::Instant::now())?;
    // The process exits next, so push now instead of waiting out the debounce
    let report = board.flush_all();
    let sync = match report {
        SyncReport { failed, .. } if failed > 0 => SyncState::LocalOnly,
        SyncReport { pushed, .. } if pushed > 0 => SyncState::Remote,
        _ => saved.sync,
    };
    let date = saved.record.start_date.unwrap_or(board.today());
    println!("Moved '{}' to {} {} ({})", saved.record.text, date, saved.record.category, sync);
    Ok(())
}

/// Handle the delete-task command
pub fn handle_delete_task(board: &mut TaskBoard, id: String) -> Result<(), CliError> {
    let id = resolve_task(board, &id)?;
    if board.delete_task(&id)? {
        println!("Task {} deleted", short_id(&id));
    } else {
        println!("Task {} was already gone", short_id(&id));
    }
    Ok(())
}

/// Handle the add-note command
pub fn handle_add_note(
    store: &Persistence,
    title: String,
    content: Option<String>,
    color: Option<String>,
    category: Option<String>,
) -> Result<(), CliError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CliError::EmptyText);
    }
    let mut note = StickyNote::new(title);
    note.content = content.unwrap_or_default();
    if let Some(color) = color.filter(|c| !c.trim().is_empty()) {
        note.color = color;
    }
    if let Some(name) = category.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        let existing = store
            .get_note_categories()?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(&name));
        let category = match existing {
            Some(category) => category,
            None => store
                .save_note_category(NoteCategory::new(name, models::default_note_color()))?
                .record,
        };
        note.category_id = Some(category.id);
    }

    let saved = store.save_note(note)?;
    println!("Note created (ID: {}, {})", saved.record.id, saved.sync);
    Ok(())
}

/// Handle the notes command
pub fn handle_notes(store: &Persistence) -> Result<(), CliError> {
    let categories = store.get_note_categories()?;
    let notes = store.get_notes()?;
    if notes.is_empty() {
        println!("No notes yet");
    }
    for note in notes {
        let category = note
            .category_id
            .as_deref()
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| format!(" [{}]", c.name))
            .unwrap_or_default();
        let pin = if note.pinned { "* " } else { "" };
        println!("{}{} {}{}", pin, short_id(&note.id), note.title, category);
    }
    Ok(())
}

/// Handle the add-decision command
pub fn handle_add_decision(
    store: &Persistence,
    title: String,
    urgent: bool,
    important: bool,
    notes: Option<String>,
) -> Result<(), CliError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CliError::EmptyText);
    }
    let mut entry = DecisionEntry::new(title, Quadrant::from_flags(urgent, important), today());
    entry.notes = notes.unwrap_or_default();
    let saved = store.save_decision(entry)?;
    println!(
        "Decision recorded in '{}' (ID: {}, {})",
        saved.record.quadrant().label(),
        saved.record.id,
        saved.sync
    );
    Ok(())
}

/// Handle the decisions command
pub fn handle_decisions(store: &Persistence) -> Result<(), CliError> {
    let entries = store.get_decisions()?;
    for (quadrant, items) in models::group_by_quadrant(&entries) {
        println!("{} ({})", quadrant.label(), items.len());
        for entry in items {
            println!("  {} {} {}", entry.decided_on, short_id(&entry.id), entry.title);
        }
    }
    Ok(())
}

/// Handle the add-alter-ego command
pub fn handle_add_alter_ego(
    store: &Persistence,
    name: String,
    description: Option<String>,
    traits: Vec<String>,
) -> Result<(), CliError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(CliError::EmptyText);
    }
    let mut ego = AlterEgo::new(name);
    ego.description = description.unwrap_or_default();
    ego.traits = traits
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let saved = store.save_alter_ego(ego)?;
    println!("Alter ego '{}' created (ID: {}, {})", saved.record.name, saved.record.id, saved.sync);
    Ok(())
}

/// Handle the alter-egos command
pub fn handle_alter_egos(store: &Persistence) -> Result<(), CliError> {
    let egos = store.get_alter_egos()?;
    if egos.is_empty() {
        println!("No alter egos yet");
    }
    for ego in egos {
        let chats = store.get_chats_for(&ego.id)?.len();
        println!("{} {} ({} chats)", short_id(&ego.id), ego.name, chats);
        if !ego.description.is_empty() {
            println!("    {}", ego.description);
        }
    }
    Ok(())
}

/// Handle the say command: append to the most recent chat, starting one if
/// there is none
pub fn handle_say(store: &Persistence, alter_ego_id: String, text: String, as_alter_ego: bool) -> Result<(), CliError> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(CliError::EmptyText);
    }
    let egos = store.get_alter_egos()?;
    let id = resolve_id("alter ego", &alter_ego_id, egos.iter().map(|e| e.id.as_str()))?;
    let ego_name = egos
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.name.clone())
        .unwrap_or_default();

    let mut chat = match store.get_chats_for(&id)?.into_iter().next() {
        Some(chat) => chat,
        None => Chat::new(id, today().format("%Y-%m-%d").to_string()),
    };
    let sender = if as_alter_ego { Sender::AlterEgo } else { Sender::Me };
    chat.push_message(sender, text);
    let saved = store.save_chat(chat)?;
    let speaker = if as_alter_ego { ego_name.as_str() } else { "You" };
    println!(
        "{} said it in '{}' ({} messages, {})",
        speaker,
        saved.record.title,
        saved.record.messages.len(),
        saved.sync
    );
    Ok(())
}

/// Handle the sync command
pub fn handle_sync(store: &Persistence) -> Result<(), CliError> {
    let report = store.sync_all()?;
    println!("Synced {} records ({} failed)", report.pushed, report.failed);
    Ok(())
}

/// Handle the theme command. The file is re-read so environment overrides
/// are never written back to it.
pub fn handle_theme(config_path: &Path, profile: Profile, name: Option<String>) -> Result<(), CliError> {
    let mut config = Config::load_from_path(config_path, profile)?;
    match name {
        Some(name) => {
            config.set_theme(name.trim())?;
            config.save_to_path(config_path)?;
            println!("Theme set to '{}'", config.current_theme);
        }
        None => {
            for theme in config.get_available_themes() {
                let marker = if theme == config.current_theme { "*" } else { " " };
                println!("{} {}", marker, theme);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_and_prefix_ids() {
        let ids = ["abc123", "abd456", "xyz"];
        assert_eq!(resolve_id("task", "xyz", ids).unwrap(), "xyz");
        assert_eq!(resolve_id("task", "abc", ids).unwrap(), "abc123");
        assert!(matches!(resolve_id("task", "ab", ids), Err(CliError::Ambiguous(..))));
        assert!(matches!(resolve_id("task", "q", ids), Err(CliError::NotFound(..))));
        assert!(matches!(resolve_id("task", "", ids), Err(CliError::NotFound(..))));
    }

    #[test]
    fn short_id_handles_short_strings() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }

    #[test]
    fn cli_parses_move_arguments() {
        let cli = Cli::try_parse_from([
            "dayboard", "move", "abc", "--to-day", "3", "--category", "work", "--index", "1",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Move { id, to_day, category, index }) => {
                assert_eq!(id, "abc");
                assert_eq!(to_day, 3);
                assert_eq!(category, Some(Category::Work));
                assert_eq!(index, 1);
            }
            _ => panic!("expected move command"),
        }
    }

    #[test]
    fn day_and_start_conflict() {
        assert!(Cli::try_parse_from(["dayboard", "add-task", "x", "--day", "1", "--start", "2024-06-10"]).is_err());
    }

    #[test]
    fn rejects_unknown_category() {
        assert!(Cli::try_parse_from(["dayboard", "add-task", "x", "--category", "errands"]).is_err());
    }
}
