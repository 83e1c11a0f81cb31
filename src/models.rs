use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a fresh record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time truncated to whole seconds so it survives a trip through the
/// remote table store unchanged
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Which board column a task lives in, independent of its date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    #[default]
    Personal,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Work, Category::Personal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
        }
    }

    pub fn other(&self) -> Category {
        match self {
            Category::Work => Category::Personal,
            Category::Personal => Category::Work,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "work" | "w" => Ok(Category::Work),
            "personal" | "p" => Ok(Category::Personal),
            other => Err(format!("unknown category '{}' (expected work or personal)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: String) -> Self {
        Self {
            id: new_id(),
            text,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Only set while `completed` is true
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub position: i64,
}

impl Task {
    pub fn new(text: String, category: Category, start_date: NaiveDate) -> Self {
        Self {
            id: new_id(),
            text,
            completed: false,
            category,
            subtasks: Vec::new(),
            start_date: Some(start_date),
            due_date: None,
            completion_date: None,
            position: 0,
        }
    }

    pub fn mark_completed(&mut self, on: NaiveDate) {
        self.completed = true;
        self.completion_date = Some(on);
    }

    pub fn reopen(&mut self) {
        self.completed = false;
        self.completion_date = None;
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }

    /// True when the task has subtasks and every one of them is done
    pub fn all_subtasks_done(&self) -> bool {
        !self.subtasks.is_empty() && self.subtasks.iter().all(|s| s.completed)
    }

    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCategory {
    pub id: String,
    pub name: String,
    #[serde(default = "default_note_color")]
    pub color: String,
}

impl NoteCategory {
    pub fn new(name: String, color: String) -> Self {
        Self {
            id: new_id(),
            name,
            color,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyNote {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_note_color")]
    pub color: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn default_note_color() -> String {
    "yellow".to_string()
}

impl StickyNote {
    pub fn new(title: String) -> Self {
        let now = now();
        Self {
            id: new_id(),
            title,
            content: String::new(),
            color: default_note_color(),
            category_id: None,
            pinned: false,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Eisenhower quadrant derived from urgency and importance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    Do,
    Schedule,
    Delegate,
    Eliminate,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Do,
        Quadrant::Schedule,
        Quadrant::Delegate,
        Quadrant::Eliminate,
    ];

    pub fn from_flags(urgent: bool, important: bool) -> Self {
        match (urgent, important) {
            (true, true) => Quadrant::Do,
            (false, true) => Quadrant::Schedule,
            (true, false) => Quadrant::Delegate,
            (false, false) => Quadrant::Eliminate,
        }
    }

    pub fn flags(&self) -> (bool, bool) {
        match self {
            Quadrant::Do => (true, true),
            Quadrant::Schedule => (false, true),
            Quadrant::Delegate => (true, false),
            Quadrant::Eliminate => (false, false),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::Do => "Do first",
            Quadrant::Schedule => "Schedule",
            Quadrant::Delegate => "Delegate",
            Quadrant::Eliminate => "Eliminate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub important: bool,
    pub decided_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DecisionEntry {
    pub fn new(title: String, quadrant: Quadrant, decided_on: NaiveDate) -> Self {
        let (urgent, important) = quadrant.flags();
        let now = now();
        Self {
            id: new_id(),
            title,
            notes: String::new(),
            urgent,
            important,
            decided_on,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn quadrant(&self) -> Quadrant {
        Quadrant::from_flags(self.urgent, self.important)
    }
}

/// Group decisions by quadrant, newest decision first inside each quadrant
pub fn group_by_quadrant(entries: &[DecisionEntry]) -> Vec<(Quadrant, Vec<&DecisionEntry>)> {
    Quadrant::ALL
        .iter()
        .map(|q| {
            let mut items: Vec<&DecisionEntry> =
                entries.iter().filter(|e| e.quadrant() == *q).collect();
            items.sort_by(|a, b| {
                b.decided_on
                    .cmp(&a.decided_on)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            (*q, items)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterEgo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlterEgo {
    pub fn new(name: String) -> Self {
        let now = now();
        Self {
            id: new_id(),
            name,
            description: String::new(),
            traits: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Me,
    AlterEgo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub alter_ego_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(alter_ego_id: String, title: String) -> Self {
        let now = now();
        Self {
            id: new_id(),
            alter_ego_id,
            title,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push_message(&mut self, sender: Sender, text: String) {
        let sent_at = now();
        self.messages.push(ChatMessage {
            sender,
            text,
            sent_at,
        });
        self.updated_at = sent_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn task_deserializes_with_missing_optional_fields() {
        let task: Task = serde_json::from_str(r#"{"id":"t1","text":"Buy milk"}"#).unwrap();
        assert_eq!(task.category, Category::Personal);
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
        assert!(task.start_date.is_none());
    }

    #[test]
    fn task_uses_camel_case_keys() {
        let mut task = Task::new("Write report".to_string(), Category::Work, date("2024-06-10"));
        task.due_date = Some(date("2024-06-12"));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["startDate"], "2024-06-10");
        assert_eq!(json["dueDate"], "2024-06-12");
        assert_eq!(json["category"], "work");
    }

    #[test]
    fn completion_sets_and_clears_date() {
        let mut task = Task::new("Run".to_string(), Category::Personal, date("2024-06-10"));
        task.mark_completed(date("2024-06-11"));
        assert_eq!(task.completion_date, Some(date("2024-06-11")));
        task.reopen();
        assert!(!task.completed);
        assert!(task.completion_date.is_none());
    }

    #[test]
    fn overdue_requires_past_due_and_open_task() {
        let today = date("2024-06-10");
        let mut task = Task::new("Pay rent".to_string(), Category::Personal, today);
        assert!(!task.is_overdue(today));
        task.due_date = Some(date("2024-06-05"));
        assert!(task.is_overdue(today));
        task.mark_completed(today);
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn category_parses_short_forms() {
        assert_eq!("W".parse::<Category>().unwrap(), Category::Work);
        assert_eq!("personal".parse::<Category>().unwrap(), Category::Personal);
        assert!("errands".parse::<Category>().is_err());
    }

    #[test]
    fn quadrant_round_trips_through_flags() {
        for q in Quadrant::ALL {
            let (urgent, important) = q.flags();
            assert_eq!(Quadrant::from_flags(urgent, important), q);
        }
    }

    #[test]
    fn decisions_group_newest_first() {
        let older = DecisionEntry::new("Old".to_string(), Quadrant::Do, date("2024-06-01"));
        let newer = DecisionEntry::new("New".to_string(), Quadrant::Do, date("2024-06-09"));
        let other = DecisionEntry::new("Skip".to_string(), Quadrant::Eliminate, date("2024-06-09"));
        let entries = vec![older, newer, other];
        let groups = group_by_quadrant(&entries);
        assert_eq!(groups[0].0, Quadrant::Do);
        assert_eq!(groups[0].1[0].title, "New");
        assert_eq!(groups[3].1.len(), 1);
    }

    #[test]
    fn chat_messages_keep_order() {
        let mut chat = Chat::new("ego-1".to_string(), "Morning".to_string());
        chat.push_message(Sender::Me, "How do I start?".to_string());
        chat.push_message(Sender::AlterEgo, "One small step.".to_string());
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].sender, Sender::AlterEgo);
    }
}
