//! Boundary mapping between in-memory records and the hosted store's
//! snake_case rows. Rows are validated here so the rest of the crate only
//! ever sees well-formed records.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::models::{
    AlterEgo, Category, Chat, ChatMessage, DecisionEntry, NoteCategory, Sender, StickyNote,
    Subtask, Task,
};

/// A persisted entity: where it lives locally and remotely, and how it maps
/// to a remote row
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Human-readable kind, used in errors and logs
    const KIND: &'static str;
    /// Local key-value key
    const COLLECTION: &'static str;
    /// Remote table
    const TABLE: &'static str;

    type Row: Serialize + DeserializeOwned;

    fn id(&self) -> &str;

    fn to_row(&self, user_id: &str) -> Self::Row;

    fn from_row(row: Self::Row) -> Result<Self, StoreError>;

    /// Records written on first run, or when the stored collection is unreadable
    fn samples(_today: NaiveDate) -> Vec<Self> {
        Vec::new()
    }
}

fn invalid(table: &'static str, reason: impl Into<String>) -> StoreError {
    StoreError::InvalidRow {
        table,
        reason: reason.into(),
    }
}

fn require_id(table: &'static str, id: &str) -> Result<(), StoreError> {
    if id.trim().is_empty() {
        return Err(invalid(table, "empty id"));
    }
    Ok(())
}

fn parse_row_date(table: &'static str, field: &str, value: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    let Some(raw) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if raw.len() <= 10 {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| invalid(table, format!("{} '{}': {}", field, raw, e)));
    }
    // Timestamps count toward the user's local day
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(stamp.with_timezone(&Local).date_naive()));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|stamp| Some(stamp.date()))
        .map_err(|e| invalid(table, format!("{} '{}': {}", field, raw, e)))
}

fn format_row_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

impl Record for Task {
    const KIND: &'static str = "task";
    const COLLECTION: &'static str = "dayboard.tasks";
    const TABLE: &'static str = "tasks";

    type Row = TaskRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> TaskRow {
        TaskRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            text: self.text.clone(),
            completed: self.completed,
            category: Some(self.category.as_str().to_string()),
            subtasks: Some(self.subtasks.clone()),
            start_date: format_row_date(self.start_date),
            due_date: format_row_date(self.due_date),
            completion_date: format_row_date(self.completion_date),
            position: Some(self.position),
        }
    }

    fn from_row(row: TaskRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        let category = match row.category.as_deref() {
            None | Some("") => Category::default(),
            Some(raw) => raw
                .parse::<Category>()
                .map_err(|e| invalid(Self::TABLE, e))?,
        };
        let completion_date = parse_row_date(Self::TABLE, "completion_date", row.completion_date)?;
        Ok(Task {
            id: row.id,
            text: row.text,
            completed: row.completed,
            category,
            subtasks: row.subtasks.unwrap_or_default(),
            start_date: parse_row_date(Self::TABLE, "start_date", row.start_date)?,
            due_date: parse_row_date(Self::TABLE, "due_date", row.due_date)?,
            // Only completed tasks carry a completion date
            completion_date: if row.completed { completion_date } else { None },
            position: row.position.unwrap_or(0),
        })
    }

    fn samples(today: NaiveDate) -> Vec<Self> {
        let mut welcome = Task::new(
            "Welcome to your board: press Space to complete me".to_string(),
            Category::Personal,
            today,
        );
        welcome.subtasks = vec![
            Subtask::new("Add a task with n".to_string()),
            Subtask::new("Move a task with m".to_string()),
        ];
        let mut plan = Task::new("Plan the week".to_string(), Category::Work, today);
        plan.position = 1;
        vec![welcome, plan]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub position: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for StickyNote {
    const KIND: &'static str = "note";
    const COLLECTION: &'static str = "dayboard.notes";
    const TABLE: &'static str = "notes";

    type Row = NoteRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> NoteRow {
        NoteRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            title: self.title.clone(),
            content: Some(self.content.clone()),
            color: Some(self.color.clone()),
            category_id: self.category_id.clone(),
            pinned: self.pinned,
            position: Some(self.position),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_row(row: NoteRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        Ok(StickyNote {
            id: row.id,
            title: row.title,
            content: row.content.unwrap_or_default(),
            color: row
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(crate::models::default_note_color),
            category_id: row.category_id.filter(|c| !c.is_empty()),
            pinned: row.pinned,
            position: row.position.unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn samples(_today: NaiveDate) -> Vec<Self> {
        let mut note = StickyNote::new("Sticky notes".to_string());
        note.content = "Notes support **markdown**.\n\n- press `y` to copy a note\n- press `n` for a new one".to_string();
        note.pinned = true;
        vec![note]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteCategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Record for NoteCategory {
    const KIND: &'static str = "note category";
    const COLLECTION: &'static str = "dayboard.note_categories";
    const TABLE: &'static str = "categories";

    type Row = NoteCategoryRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> NoteCategoryRow {
        NoteCategoryRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            name: self.name.clone(),
            color: Some(self.color.clone()),
        }
    }

    fn from_row(row: NoteCategoryRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        if row.name.trim().is_empty() {
            return Err(invalid(Self::TABLE, "empty category name"));
        }
        Ok(NoteCategory {
            id: row.id,
            name: row.name,
            color: row.color.unwrap_or_else(crate::models::default_note_color),
        })
    }

    fn samples(_today: NaiveDate) -> Vec<Self> {
        vec![
            NoteCategory::new("General".to_string(), "yellow".to_string()),
            NoteCategory::new("Ideas".to_string(), "lightgreen".to_string()),
            NoteCategory::new("Work".to_string(), "lightblue".to_string()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    pub decided_on: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for DecisionEntry {
    const KIND: &'static str = "decision";
    const COLLECTION: &'static str = "dayboard.decisions";
    const TABLE: &'static str = "decision_matrix";

    type Row = DecisionRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> DecisionRow {
        DecisionRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            title: self.title.clone(),
            notes: Some(self.notes.clone()),
            urgent: self.urgent,
            important: self.important,
            decided_on: self.decided_on.format("%Y-%m-%d").to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_row(row: DecisionRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        let decided_on = parse_row_date(Self::TABLE, "decided_on", Some(row.decided_on))?
            .ok_or_else(|| invalid(Self::TABLE, "missing decided_on"))?;
        Ok(DecisionEntry {
            id: row.id,
            title: row.title,
            notes: row.notes.unwrap_or_default(),
            urgent: row.urgent,
            important: row.important,
            decided_on,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlterEgoRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub traits: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for AlterEgo {
    const KIND: &'static str = "alter ego";
    const COLLECTION: &'static str = "dayboard.alter_egos";
    const TABLE: &'static str = "alter_egos";

    type Row = AlterEgoRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> AlterEgoRow {
        AlterEgoRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            traits: Some(self.traits.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_row(row: AlterEgoRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        if row.name.trim().is_empty() {
            return Err(invalid(Self::TABLE, "empty alter ego name"));
        }
        Ok(AlterEgo {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            traits: row.traits.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn samples(_today: NaiveDate) -> Vec<Self> {
        let mut future_me = AlterEgo::new("Future Me".to_string());
        future_me.description = "Calm, five years ahead, already knows how this turns out".to_string();
        future_me.traits = vec!["patient".to_string(), "honest".to_string()];
        vec![future_me]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRow {
    pub id: String,
    pub user_id: String,
    pub alter_ego_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<MessageRow>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Chat {
    const KIND: &'static str = "chat";
    const COLLECTION: &'static str = "dayboard.chats";
    const TABLE: &'static str = "chats";

    type Row = ChatRow;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_row(&self, user_id: &str) -> ChatRow {
        ChatRow {
            id: self.id.clone(),
            user_id: user_id.to_string(),
            alter_ego_id: self.alter_ego_id.clone(),
            title: Some(self.title.clone()),
            messages: Some(
                self.messages
                    .iter()
                    .map(|m| MessageRow {
                        sender: m.sender,
                        text: m.text.clone(),
                        sent_at: m.sent_at,
                    })
                    .collect(),
            ),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_row(row: ChatRow) -> Result<Self, StoreError> {
        require_id(Self::TABLE, &row.id)?;
        if row.alter_ego_id.trim().is_empty() {
            return Err(invalid(Self::TABLE, "chat without alter_ego_id"));
        }
        Ok(Chat {
            id: row.id,
            alter_ego_id: row.alter_ego_id,
            title: row.title.unwrap_or_default(),
            messages: row
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| ChatMessage {
                    sender: m.sender,
                    text: m.text,
                    sent_at: m.sent_at,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn task_row_uses_snake_case_dates() {
        let mut task = Task::new("Ship".to_string(), Category::Work, date("2024-06-10"));
        task.due_date = Some(date("2024-06-12"));
        let row = serde_json::to_value(task.to_row("u1")).unwrap();
        assert_eq!(row["start_date"], "2024-06-10");
        assert_eq!(row["due_date"], "2024-06-12");
        assert_eq!(row["completion_date"], serde_json::Value::Null);
        assert_eq!(row["user_id"], "u1");
        assert_eq!(row["category"], "work");
    }

    #[test]
    fn task_row_round_trips() {
        let mut task = Task::new("Ship".to_string(), Category::Work, date("2024-06-10"));
        task.subtasks.push(Subtask::new("Tag release".to_string()));
        task.mark_completed(date("2024-06-11"));
        task.position = 4;
        let back = Task::from_row(task.to_row("u1")).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn task_row_accepts_sparse_rows() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "t9",
            "user_id": "u1",
            "text": "Sparse",
            "start_date": "2024-06-10T00:00:00+00:00"
        }))
        .unwrap();
        let task = Task::from_row(row).unwrap();
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.start_date, Some(date("2024-06-10")));
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn task_row_drops_completion_date_of_open_task() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "t1", "user_id": "u1", "text": "x",
            "completed": false, "completion_date": "2024-06-10"
        }))
        .unwrap();
        assert!(Task::from_row(row).unwrap().completion_date.is_none());
    }

    #[test]
    fn task_row_rejects_bad_category_and_date() {
        let bad_category: TaskRow = serde_json::from_value(json!({
            "id": "t1", "user_id": "u1", "text": "x", "category": "errands"
        }))
        .unwrap();
        assert!(matches!(Task::from_row(bad_category), Err(StoreError::InvalidRow { .. })));

        let bad_date: TaskRow = serde_json::from_value(json!({
            "id": "t1", "user_id": "u1", "text": "x", "due_date": "soon"
        }))
        .unwrap();
        assert!(matches!(Task::from_row(bad_date), Err(StoreError::InvalidRow { .. })));
    }

    #[test]
    fn decision_row_round_trips() {
        let entry = DecisionEntry::new("Hire help".to_string(), crate::models::Quadrant::Delegate, date("2024-06-10"));
        let back = DecisionEntry::from_row(entry.to_row("u1")).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn chat_row_round_trips_messages() {
        let mut chat = Chat::new("ego".to_string(), "Evening".to_string());
        chat.push_message(Sender::Me, "hi".to_string());
        let row = serde_json::to_value(chat.to_row("u1")).unwrap();
        assert_eq!(row["alter_ego_id"], "ego");
        assert_eq!(row["messages"][0]["sender"], "me");
        let back = Chat::from_row(serde_json::from_value(row).unwrap()).unwrap();
        assert_eq!(back, chat);
    }

    #[test]
    fn row_timestamps_map_to_the_local_day() {
        let late = Local.with_ymd_and_hms(2024, 6, 10, 23, 30, 0).unwrap();
        let stamp = late.with_timezone(&Utc).to_rfc3339();
        assert_eq!(
            parse_row_date("tasks", "due_date", Some(stamp)).unwrap(),
            Some(date("2024-06-10"))
        );
        assert_eq!(
            parse_row_date("tasks", "due_date", Some("2024-06-10T08:00:00".to_string())).unwrap(),
            Some(date("2024-06-10"))
        );
        assert_eq!(parse_row_date("tasks", "due_date", Some(" ".to_string())).unwrap(), None);
        assert!(parse_row_date("tasks", "due_date", Some("tomorrow morning".to_string())).is_err());
    }

    #[test]
    fn samples_are_seedable() {
        let today = date("2024-06-10");
        let tasks = Task::samples(today);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.start_date == Some(today)));
        assert_eq!(NoteCategory::samples(today).len(), 3);
        assert!(DecisionEntry::samples(today).is_empty());
    }
}
