//! Day bucketing and task placement for the rolling board.
//!
//! The board is a pure view over the flat task list: every refresh rebuilds
//! the buckets from scratch, and the only mutation here is [`move_task`],
//! which edits a set of buckets in place the same way a drag and drop would.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Category, Task};

/// Section of a day column a task is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Overdue,
    Todo,
    Completed,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Overdue, Section::Todo, Section::Completed];

    pub fn label(&self) -> &'static str {
        match self {
            Section::Overdue => "Overdue",
            Section::Todo => "To-Do",
            Section::Completed => "Completed",
        }
    }
}

/// How To-Do items are ordered inside a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoOrder {
    /// Stored position, then insertion order
    #[default]
    Position,
    /// Due date ascending with undated tasks last, then text
    DueDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardOptions {
    pub days_back: u32,
    pub horizon_days: u32,
    pub todo_order: TodoOrder,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            days_back: 0,
            horizon_days: 7,
            todo_order: TodoOrder::Position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub is_past: bool,
    pub overdue: Vec<Task>,
    pub todo: Vec<Task>,
    pub completed: Vec<Task>,
}

/// Borrowed view of one category inside a bucket, in display order
#[derive(Debug, Default)]
pub struct Column<'a> {
    pub overdue: Vec<&'a Task>,
    pub todo: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl<'a> Column<'a> {
    /// Flattened entries: overdue, then to-do, then completed
    pub fn entries(&self) -> Vec<(Section, &'a Task)> {
        let overdue = self.overdue.iter().map(|t| (Section::Overdue, *t));
        let todo = self.todo.iter().map(|t| (Section::Todo, *t));
        let completed = self.completed.iter().map(|t| (Section::Completed, *t));
        overdue.chain(todo).chain(completed).collect()
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.todo.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DayBucket {
    fn empty(date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            date,
            is_past: date < today,
            overdue: Vec::new(),
            todo: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Every task placed in this bucket, section by section
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.overdue.iter().chain(self.todo.iter()).chain(self.completed.iter())
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.todo.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn section(&self, section: Section) -> &[Task] {
        match section {
            Section::Overdue => &self.overdue,
            Section::Todo => &self.todo,
            Section::Completed => &self.completed,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<Task> {
        match section {
            Section::Overdue => &mut self.overdue,
            Section::Todo => &mut self.todo,
            Section::Completed => &mut self.completed,
        }
    }

    pub fn column(&self, category: Category) -> Column<'_> {
        Column {
            overdue: of_category(&self.overdue, category),
            todo: of_category(&self.todo, category),
            completed: of_category(&self.completed, category),
        }
    }

    /// Section and index of a task id within this bucket
    pub fn find(&self, id: &str) -> Option<(Section, usize)> {
        Section::ALL.iter().find_map(|section| {
            self.section(*section)
                .iter()
                .position(|t| t.id == id)
                .map(|index| (*section, index))
        })
    }
}

fn of_category(tasks: &[Task], category: Category) -> Vec<&Task> {
    tasks.iter().filter(|t| t.category == category).collect()
}

/// Day and section a task belongs to on a board anchored at `today`.
///
/// Completed tasks stay on the day they were completed. Open tasks that are
/// past due show as overdue today; everything else uses its start date, then
/// due date, then today, with anything dated before today rolled into today.
pub fn place(task: &Task, today: NaiveDate) -> (NaiveDate, Section) {
    if task.completed {
        let day = task
            .completion_date
            .or(task.start_date)
            .or(task.due_date)
            .unwrap_or(today);
        return (day, Section::Completed);
    }
    if task.is_overdue(today) {
        return (today, Section::Overdue);
    }
    let effective = task.start_date.or(task.due_date).unwrap_or(today);
    (effective.max(today), Section::Todo)
}

/// Bucket tasks into `horizon_days` days starting today
pub fn bucket_tasks(tasks: &[Task], today: NaiveDate, horizon_days: u32) -> Vec<DayBucket> {
    let options = BoardOptions {
        horizon_days,
        ..BoardOptions::default()
    };
    bucket_window(tasks, today, &options)
}

/// Bucket tasks into `days_back + horizon_days` consecutive days, oldest first
pub fn bucket_window(tasks: &[Task], today: NaiveDate, options: &BoardOptions) -> Vec<DayBucket> {
    let start = today
        .checked_sub_days(Days::new(u64::from(options.days_back)))
        .unwrap_or(today);
    let total = u64::from(options.days_back) + u64::from(options.horizon_days);
    let mut buckets: Vec<DayBucket> = (0..total)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .map(|date| DayBucket::empty(date, today))
        .collect();

    // Stable: equal positions keep their input order
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|t| t.position);

    let mut seen: HashSet<&str> = HashSet::new();
    for task in ordered {
        if !seen.insert(task.id.as_str()) {
            continue;
        }
        let (date, section) = place(task, today);
        let offset = (date - start).num_days();
        if offset < 0 {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(offset as usize) {
            bucket.section_mut(section).push(task.clone());
        }
    }

    if options.todo_order == TodoOrder::DueDate {
        for bucket in &mut buckets {
            bucket.todo.sort_by(|a, b| {
                a.due_date
                    .is_none()
                    .cmp(&b.due_date.is_none())
                    .then_with(|| a.due_date.cmp(&b.due_date))
                    .then_with(|| a.text.cmp(&b.text))
            });
        }
    }

    buckets
}

/// The board's "today": the first bucket that is not in the past
pub fn board_today(buckets: &[DayBucket]) -> Option<NaiveDate> {
    buckets
        .iter()
        .find(|b| !b.is_past)
        .map(|b| b.date)
        .or_else(|| buckets.last().and_then(|b| b.date.succ_opt()))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Day {0} is outside the board ({1} days shown)")]
    DayOutOfRange(usize, usize),
    #[error("Cannot move an open task onto a past day ({0})")]
    PastDay(NaiveDate),
}

/// A drag from one (day, category) slot to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub task_id: String,
    pub from_day: usize,
    pub to_day: usize,
    pub from_category: Category,
    pub to_category: Category,
    /// Index in the source column, used only when the id is not on the board
    pub source_index: Option<usize>,
    /// Index in the target section of the target category; clamped
    pub target_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub task: Task,
    /// Other tasks in the target column whose position changed
    pub reordered: Vec<Task>,
}

fn locate(buckets: &[DayBucket], req: &MoveRequest) -> Option<(usize, Section, usize)> {
    for (day, bucket) in buckets.iter().enumerate() {
        if let Some((section, index)) = bucket.find(&req.task_id) {
            return Some((day, section, index));
        }
    }

    let source_index = req.source_index?;
    let bucket = buckets.get(req.from_day)?;
    let column = bucket.column(req.from_category);
    let (section, task) = column.entries().get(source_index).copied()?;
    let index = bucket.section(section).iter().position(|t| t.id == task.id)?;
    Some((req.from_day, section, index))
}

/// Move a task to another day and/or category and splice it in at
/// `target_index`.
///
/// The task is looked up by id anywhere on the board; the source index is a
/// fallback for callers whose id went stale. Buckets are left untouched when
/// the move is rejected.
pub fn move_task(buckets: &mut [DayBucket], req: &MoveRequest) -> Result<MoveOutcome, BoardError> {
    let day_count = buckets.len();
    if req.to_day >= day_count {
        return Err(BoardError::DayOutOfRange(req.to_day, day_count));
    }
    let Some(today) = board_today(buckets) else {
        return Err(BoardError::DayOutOfRange(req.to_day, day_count));
    };

    let Some((day, section, index)) = locate(buckets, req) else {
        tracing::warn!(task_id = %req.task_id, from_day = req.from_day, "move_task: task not on board");
        return Err(BoardError::TaskNotFound(req.task_id.clone()));
    };

    let target_date = buckets[req.to_day].date;
    let day_changed = day != req.to_day;
    if day_changed && buckets[req.to_day].is_past && !buckets[day].section(section)[index].completed {
        return Err(BoardError::PastDay(target_date));
    }

    let mut task = buckets[day].section_mut(section).remove(index);
    task.category = req.to_category;
    if day_changed {
        task.start_date = Some(target_date);
        task.due_date = Some(target_date);
        if task.completed {
            task.completion_date = Some(target_date);
        }
    }

    let (_, target_section) = place(&task, today);
    let moved_id = task.id.clone();
    let list = buckets[req.to_day].section_mut(target_section);
    let slots: Vec<usize> = list
        .iter()
        .enumerate()
        .filter(|(_, t)| t.category == req.to_category)
        .map(|(i, _)| i)
        .collect();
    let insert_at = match slots.get(req.target_index) {
        Some(&i) => i,
        None => slots.last().map(|&i| i + 1).unwrap_or(list.len()),
    };
    list.insert(insert_at, task);

    let mut reordered = Vec::new();
    for (pos, t) in list
        .iter_mut()
        .filter(|t| t.category == req.to_category)
        .enumerate()
    {
        let pos = pos as i64;
        if t.position != pos {
            t.position = pos;
            if t.id != moved_id {
                reordered.push(t.clone());
            }
        }
    }

    tracing::debug!(task_id = %moved_id, to_day = req.to_day, category = %req.to_category, "task moved");
    Ok(MoveOutcome {
        task: list[insert_at].clone(),
        reordered,
    })
}
