//! Task board state: the flat task list, its bucketed view, and the write
//! path from user actions to persistence.

use chrono::NaiveDate;
use std::time::Instant;
use thiserror::Error;

use crate::board::{self, BoardError, BoardOptions, DayBucket, MoveRequest};
use crate::config::BoardConfig;
use crate::models::{Category, Subtask, Task};
use crate::store::{Persistence, Saved, StoreError, SyncReport, SyncState};
use crate::sync::MoveDebouncer;
use crate::utils;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Subtask not found: {0}")]
    SubtaskNotFound(String),
    #[error("Task text cannot be empty")]
    EmptyText,
}

/// What the board view can ask for
#[derive(Debug, Clone, PartialEq)]
pub enum BoardAction {
    TaskClick { task_id: String },
    ToggleCompletion { task_id: String },
    MoveTask(MoveRequest),
    AddTask {
        text: String,
        category: Category,
        day: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The clicked task, for a detail view
    Selected(Task),
    Saved(Saved<Task>),
    /// The action was refused; nothing changed
    Rejected(String),
}

pub struct TaskBoard {
    store: Persistence,
    options: BoardOptions,
    auto_complete_parent: bool,
    today: NaiveDate,
    tasks: Vec<Task>,
    buckets: Vec<DayBucket>,
    debouncer: MoveDebouncer,
}

impl TaskBoard {
    pub fn new(store: Persistence, config: &BoardConfig) -> Self {
        let options = config.options();
        let today = utils::today();
        Self {
            store,
            options,
            auto_complete_parent: config.auto_complete_parent,
            today,
            tasks: Vec::new(),
            buckets: board::bucket_window(&[], today, &options),
            debouncer: MoveDebouncer::new(config.move_debounce()),
        }
    }

    /// Reload tasks from persistence. Pending moves are pushed first so a
    /// remote read cannot hand back their stale state.
    pub fn load(&mut self) -> Result<(), PlannerError> {
        self.flush_all();
        self.tasks = self.store.get_tasks()?;
        self.rebuild();
        tracing::debug!(tasks = self.tasks.len(), "board loaded");
        Ok(())
    }

    /// Recompute the buckets for a (possibly new) day without reloading
    pub fn refresh(&mut self, today: NaiveDate) {
        self.today = today;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.buckets = board::bucket_window(&self.tasks, self.today, &self.options);
    }

    pub fn buckets(&self) -> &[DayBucket] {
        &self.buckets
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn options(&self) -> &BoardOptions {
        &self.options
    }

    pub fn store(&self) -> &Persistence {
        &self.store
    }

    /// Number of moved tasks still waiting for a remote push
    pub fn pending_sync(&self) -> usize {
        self.debouncer.len()
    }

    /// Single entry point for the board view
    pub fn handle(&mut self, action: BoardAction, now: Instant) -> ActionOutcome {
        let result = match action {
            BoardAction::TaskClick { task_id } => {
                return match self.task(&task_id) {
                    Some(task) => ActionOutcome::Selected(task.clone()),
                    None => ActionOutcome::Rejected(PlannerError::TaskNotFound(task_id).to_string()),
                };
            }
            BoardAction::ToggleCompletion { task_id } => self.toggle_completion(&task_id),
            BoardAction::MoveTask(req) => self.move_task(&req, now),
            BoardAction::AddTask { text, category, day } => self.add_task(&text, category, Some(day)),
        };
        match result {
            Ok(saved) => ActionOutcome::Saved(saved),
            Err(e) => {
                tracing::warn!(error = %e, "board action rejected");
                ActionOutcome::Rejected(e.to_string())
            }
        }
    }

    /// Add a task to the bucket at `day` (today when `None`)
    pub fn add_task(&mut self, text: &str, category: Category, day: Option<usize>) -> Result<Saved<Task>, PlannerError> {
        let start = match day {
            Some(index) => self
                .buckets
                .get(index)
                .map(|b| b.date)
                .ok_or(BoardError::DayOutOfRange(index, self.buckets.len()))?,
            None => self.today,
        };
        self.add_task_on(text, category, start, None)
    }

    pub fn add_task_on(
        &mut self,
        text: &str,
        category: Category,
        start: NaiveDate,
        due: Option<NaiveDate>,
    ) -> Result<Saved<Task>, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::EmptyText);
        }
        let mut task = Task::new(text.to_string(), category, start);
        task.due_date = due;
        task.position = self
            .tasks
            .iter()
            .filter(|t| t.category == category && t.start_date == Some(start))
            .map(|t| t.position + 1)
            .max()
            .unwrap_or(0);

        let saved = self.store.save_task(task)?;
        self.tasks.push(saved.record.clone());
        self.rebuild();
        Ok(saved)
    }

    fn update<F>(&mut self, id: &str, change: F) -> Result<Saved<Task>, PlannerError>
    where
        F: FnOnce(&mut Task, NaiveDate, bool) -> Result<(), PlannerError>,
    {
        let today = self.today;
        let auto_complete_parent = self.auto_complete_parent;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PlannerError::TaskNotFound(id.to_string()))?;
        change(task, today, auto_complete_parent)?;
        let snapshot = task.clone();

        let saved = self.store.save_task(snapshot)?;
        if saved.sync == SyncState::Remote {
            self.debouncer.cancel(id);
        }
        self.rebuild();
        Ok(saved)
    }

    pub fn edit_task(&mut self, id: &str, text: &str) -> Result<Saved<Task>, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::EmptyText);
        }
        self.update(id, |task, _, _| {
            task.text = text.to_string();
            Ok(())
        })
    }

    pub fn set_due_date(&mut self, id: &str, due: Option<NaiveDate>) -> Result<Saved<Task>, PlannerError> {
        self.update(id, |task, _, _| {
            task.due_date = due;
            Ok(())
        })
    }

    /// Complete an open task today, or reopen a completed one
    pub fn toggle_completion(&mut self, id: &str) -> Result<Saved<Task>, PlannerError> {
        self.update(id, |task, today, _| {
            if task.completed {
                task.reopen();
            } else {
                task.mark_completed(today);
            }
            Ok(())
        })
    }

    pub fn add_subtask(&mut self, task_id: &str, text: &str) -> Result<Saved<Task>, PlannerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PlannerError::EmptyText);
        }
        self.update(task_id, |task, _, _| {
            task.subtasks.push(Subtask::new(text.to_string()));
            Ok(())
        })
    }

    /// Flip a subtask. With auto-completion on, finishing the last open
    /// subtask completes the parent and reopening one reopens it.
    pub fn toggle_subtask(&mut self, task_id: &str, subtask_id: &str) -> Result<Saved<Task>, PlannerError> {
        self.update(task_id, |task, today, auto_complete_parent| {
            let subtask = task
                .subtasks
                .iter_mut()
                .find(|s| s.id == subtask_id)
                .ok_or_else(|| PlannerError::SubtaskNotFound(subtask_id.to_string()))?;
            subtask.completed = !subtask.completed;
            let reopened = !subtask.completed;

            if auto_complete_parent {
                if task.all_subtasks_done() && !task.completed {
                    task.mark_completed(today);
                } else if reopened && task.completed {
                    task.reopen();
                }
            }
            Ok(())
        })
    }

    pub fn delete_subtask(&mut self, task_id: &str, subtask_id: &str) -> Result<Saved<Task>, PlannerError> {
        self.update(task_id, |task, _, _| {
            let before = task.subtasks.len();
            task.subtasks.retain(|s| s.id != subtask_id);
            if task.subtasks.len() == before {
                return Err(PlannerError::SubtaskNotFound(subtask_id.to_string()));
            }
            Ok(())
        })
    }

    pub fn delete_task(&mut self, id: &str) -> Result<bool, PlannerError> {
        let removed = self.store.delete_task(id)?;
        self.tasks.retain(|t| t.id != id);
        self.debouncer.cancel(id);
        self.rebuild();
        Ok(removed)
    }

    /// Apply a move to the board immediately and write it through locally.
    /// The remote push waits for the debounce window so a burst of moves of
    /// the same task ends up as one write of its final state.
    pub fn move_task(&mut self, req: &MoveRequest, now: Instant) -> Result<Saved<Task>, PlannerError> {
        let outcome = board::move_task(&mut self.buckets, req)?;

        for changed in std::iter::once(&outcome.task).chain(outcome.reordered.iter()) {
            match self.tasks.iter_mut().find(|t| t.id == changed.id) {
                Some(existing) => *existing = changed.clone(),
                None => self.tasks.push(changed.clone()),
            }
            self.store.save_local(changed.clone())?;
            self.debouncer.touch(&changed.id, now);
        }

        let sync = if self.store.has_remote() {
            SyncState::Pending
        } else {
            SyncState::LocalOnly
        };
        self.rebuild();
        Ok(Saved {
            record: outcome.task,
            sync,
        })
    }

    /// Push moved tasks whose quiet period has elapsed
    pub fn flush_due(&mut self, now: Instant) -> SyncReport {
        let ids = self.debouncer.due(now);
        self.push_ids(&ids)
    }

    /// Push every pending move, e.g. before exit
    pub fn flush_all(&mut self) -> SyncReport {
        let ids = self.debouncer.drain_all();
        self.push_ids(&ids)
    }

    fn push_ids(&self, ids: &[String]) -> SyncReport {
        let mut report = SyncReport::default();
        for id in ids {
            // Deleted since it was queued
            let Some(task) = self.task(id) else { continue };
            match self.store.push(task) {
                SyncState::Remote => report.pushed += 1,
                _ => report.failed += 1,
            }
        }
        if !ids.is_empty() {
            tracing::debug!(pushed = report.pushed, failed = report.failed, "flushed moves");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Section;
    use crate::store::{LocalStore, MemoryRemote, Record};
    use std::time::Duration;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        date("2024-06-10")
    }

    fn local_board() -> TaskBoard {
        let store = Persistence::local_only(LocalStore::in_memory().unwrap(), "u1").with_seeding(false);
        let mut board = TaskBoard::new(store, &BoardConfig::default());
        board.load().unwrap();
        board.refresh(today());
        board
    }

    fn remote_board() -> (TaskBoard, MemoryRemote) {
        let remote = MemoryRemote::new();
        let store = Persistence::new(
            LocalStore::in_memory().unwrap(),
            Some(Box::new(remote.clone())),
            "u1",
        )
        .with_seeding(false);
        let mut board = TaskBoard::new(store, &BoardConfig::default());
        board.load().unwrap();
        board.refresh(today());
        (board, remote)
    }

    fn move_to(task_id: &str, to_day: usize, category: Category) -> MoveRequest {
        MoveRequest {
            task_id: task_id.to_string(),
            from_day: 0,
            to_day,
            from_category: Category::Personal,
            to_category: category,
            source_index: None,
            target_index: 0,
        }
    }

    #[test]
    fn added_task_lands_in_chosen_day() {
        let mut board = local_board();
        let saved = board.add_task("Dentist", Category::Personal, Some(2)).unwrap();
        assert_eq!(saved.sync, SyncState::LocalOnly);
        assert_eq!(saved.record.start_date, Some(date("2024-06-12")));
        assert_eq!(board.buckets()[2].todo[0].text, "Dentist");
    }

    #[test]
    fn add_rejects_empty_text_and_bad_day() {
        let mut board = local_board();
        assert!(matches!(
            board.add_task("   ", Category::Work, None),
            Err(PlannerError::EmptyText)
        ));
        assert!(matches!(
            board.add_task("x", Category::Work, Some(9)),
            Err(PlannerError::Board(BoardError::DayOutOfRange(9, 7)))
        ));
    }

    #[test]
    fn new_tasks_append_to_their_column() {
        let mut board = local_board();
        board.add_task("one", Category::Work, None).unwrap();
        let second = board.add_task("two", Category::Work, None).unwrap();
        assert_eq!(second.record.position, 1);
    }

    #[test]
    fn toggle_completion_moves_task_to_completed_section() {
        let mut board = local_board();
        let id = board.add_task("Run", Category::Personal, None).unwrap().record.id;
        let saved = board.toggle_completion(&id).unwrap();
        assert_eq!(saved.record.completion_date, Some(today()));
        assert_eq!(board.buckets()[0].find(&id), Some((Section::Completed, 0)));

        let reopened = board.toggle_completion(&id).unwrap();
        assert!(reopened.record.completion_date.is_none());
        assert_eq!(board.buckets()[0].find(&id), Some((Section::Todo, 0)));
    }

    #[test]
    fn finishing_last_subtask_completes_parent() {
        let mut board = local_board();
        let id = board.add_task("Trip", Category::Personal, None).unwrap().record.id;
        board.add_subtask(&id, "Book train").unwrap();
        let task = board.add_subtask(&id, "Pack").unwrap().record;
        let (a, b) = (task.subtasks[0].id.clone(), task.subtasks[1].id.clone());

        assert!(!board.toggle_subtask(&id, &a).unwrap().record.completed);
        assert!(board.toggle_subtask(&id, &b).unwrap().record.completed);
        // Reopening a subtask reopens the parent
        assert!(!board.toggle_subtask(&id, &b).unwrap().record.completed);
    }

    #[test]
    fn subtask_errors_are_reported() {
        let mut board = local_board();
        let id = board.add_task("Trip", Category::Personal, None).unwrap().record.id;
        assert!(matches!(
            board.toggle_subtask(&id, "nope"),
            Err(PlannerError::SubtaskNotFound(_))
        ));
        assert!(matches!(
            board.delete_subtask(&id, "nope"),
            Err(PlannerError::SubtaskNotFound(_))
        ));
        assert!(matches!(
            board.edit_task("missing", "x"),
            Err(PlannerError::TaskNotFound(_))
        ));
    }

    #[test]
    fn move_updates_board_and_local_store() {
        let mut board = local_board();
        let id = board.add_task("Report", Category::Personal, None).unwrap().record.id;
        let saved = board.move_task(&move_to(&id, 3, Category::Work), Instant::now()).unwrap();
        assert_eq!(saved.sync, SyncState::LocalOnly);
        assert_eq!(saved.record.category, Category::Work);
        assert_eq!(saved.record.start_date, Some(date("2024-06-13")));
        assert_eq!(board.buckets()[3].find(&id), Some((Section::Todo, 0)));

        let stored = board.store().get_tasks().unwrap();
        assert_eq!(stored[0].start_date, Some(date("2024-06-13")));
    }

    #[test]
    fn rejected_move_changes_nothing() {
        let mut board = local_board();
        board.add_task("Report", Category::Personal, None).unwrap();
        let before = board.buckets().to_vec();
        let outcome = board.handle(BoardAction::MoveTask(move_to("ghost", 1, Category::Work)), Instant::now());
        assert!(matches!(outcome, ActionOutcome::Rejected(_)));
        assert_eq!(board.buckets(), before.as_slice());
        assert_eq!(board.pending_sync(), 0);
    }

    #[test]
    fn rapid_moves_coalesce_into_one_remote_write() {
        let (mut board, remote) = remote_board();
        let id = board.add_task("Report", Category::Personal, None).unwrap().record.id;
        let start = Instant::now();

        board.move_task(&move_to(&id, 1, Category::Personal), start).unwrap();
        let saved = board
            .move_task(&move_to(&id, 4, Category::Personal), start + Duration::from_millis(50))
            .unwrap();
        assert_eq!(saved.sync, SyncState::Pending);

        // Still inside the window: the remote has the pre-move row
        assert_eq!(board.flush_due(start + Duration::from_millis(100)), SyncReport::default());
        let row = &remote.rows("tasks")[0];
        assert_eq!(row["start_date"], "2024-06-10");

        let report = board.flush_due(start + Duration::from_millis(200));
        assert_eq!(report.pushed, 1);
        let row = Task::from_row(serde_json::from_value(remote.rows("tasks")[0].clone()).unwrap()).unwrap();
        assert_eq!(row.start_date, Some(date("2024-06-14")));
        assert_eq!(board.pending_sync(), 0);
    }

    #[test]
    fn failed_flush_keeps_local_write() {
        let (mut board, remote) = remote_board();
        let id = board.add_task("Report", Category::Personal, None).unwrap().record.id;
        remote.set_offline(true);
        board.move_task(&move_to(&id, 2, Category::Work), Instant::now()).unwrap();
        let report = board.flush_all();
        assert_eq!(report.failed, 1);

        let local = board.store().get_tasks().unwrap();
        assert_eq!(local[0].category, Category::Work);
    }

    #[test]
    fn handle_covers_view_callbacks() {
        let mut board = local_board();
        let now = Instant::now();
        let added = board.handle(
            BoardAction::AddTask {
                text: "Call mum".to_string(),
                category: Category::Personal,
                day: 0,
            },
            now,
        );
        let ActionOutcome::Saved(saved) = added else {
            panic!("expected the task to be saved");
        };
        let id = saved.record.id.clone();

        assert!(matches!(
            board.handle(BoardAction::TaskClick { task_id: id.clone() }, now),
            ActionOutcome::Selected(ref t) if t.id == id
        ));
        assert!(matches!(
            board.handle(BoardAction::ToggleCompletion { task_id: id.clone() }, now),
            ActionOutcome::Saved(ref s) if s.record.completed
        ));
    }

    #[test]
    fn delete_task_drops_pending_move() {
        let (mut board, _remote) = remote_board();
        let id = board.add_task("Gone", Category::Work, None).unwrap().record.id;
        board.move_task(&move_to(&id, 1, Category::Work), Instant::now()).unwrap();
        assert!(board.delete_task(&id).unwrap());
        assert_eq!(board.pending_sync(), 0);
        assert!(board.buckets().iter().all(|b| b.find(&id).is_none()));
    }
}
