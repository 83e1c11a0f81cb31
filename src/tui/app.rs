use chrono::NaiveDate;
use std::time::Instant;

use crate::board::{MoveRequest, Section};
use crate::config::KeyBindings;
use crate::models::{
    AlterEgo, Category, Chat, DecisionEntry, NoteCategory, Quadrant, Sender, StickyNote, Task,
    group_by_quadrant,
};
use crate::planner::{ActionOutcome, BoardAction, TaskBoard};
use crate::store::{Persistence, SyncReport, SyncState};
use crate::tui::error::TuiError;
use crate::tui::widgets::color::next_note_color;
use crate::tui::widgets::input::Input;
use crate::tui::widgets::truncate;
use crate::utils::{self, ParsedKeyBinding, format_key_binding_for_display, parse_key_binding};
use crate::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Board,
    Notes,
    Decisions,
    AlterEgos,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Board, Tab::Notes, Tab::Decisions, Tab::AlterEgos];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Board => "Board",
            Tab::Notes => "Notes",
            Tab::Decisions => "Decisions",
            Tab::AlterEgos => "Alter Egos",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Board => 0,
            Tab::Notes => 1,
            Tab::Decisions => 2,
            Tab::AlterEgos => 3,
        }
    }

    pub fn next(&self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(&self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Help,
    Input,
    TaskDetail,
    ConfirmDelete,
}

/// Board slot under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardCursor {
    pub day: usize,
    pub category: Category,
    pub index: usize,
}

/// A task lifted off the board, waiting to be dropped somewhere else
#[derive(Debug, Clone, PartialEq)]
pub struct PickedUp {
    pub task_id: String,
    pub text: String,
    pub from_day: usize,
    pub from_category: Category,
    pub source_index: usize,
    pub section: Section,
    pub completed: bool,
}

/// What a submitted prompt does
#[derive(Debug, Clone, PartialEq)]
pub enum InputPurpose {
    NewTask { day: usize, category: Category },
    EditTask { task_id: String },
    AddSubtask { task_id: String },
    NewNote,
    EditNoteTitle { note_id: String },
    EditNoteContent { note_id: String },
    NewDecision { quadrant: Quadrant },
    EditDecision { entry_id: String },
    NewAlterEgo,
    ChatMessage { alter_ego_id: String, sender: Sender },
}

impl InputPurpose {
    pub fn title(&self) -> String {
        match self {
            InputPurpose::NewTask { category, .. } => format!("New {} task", category),
            InputPurpose::EditTask { .. } => "Edit task".to_string(),
            InputPurpose::AddSubtask { .. } => "New subtask".to_string(),
            InputPurpose::NewNote => "New note title".to_string(),
            InputPurpose::EditNoteTitle { .. } => "Rename note".to_string(),
            InputPurpose::EditNoteContent { .. } => "Note content (markdown)".to_string(),
            InputPurpose::NewDecision { quadrant } => format!("New decision: {}", quadrant.label()),
            InputPurpose::EditDecision { .. } => "Edit decision".to_string(),
            InputPurpose::NewAlterEgo => "Alter ego name".to_string(),
            InputPurpose::ChatMessage { sender: Sender::Me, .. } => "Write as yourself".to_string(),
            InputPurpose::ChatMessage { sender: Sender::AlterEgo, .. } => {
                "Write as the alter ego".to_string()
            }
        }
    }

    fn multiline(&self) -> bool {
        matches!(self, InputPurpose::EditNoteContent { .. })
    }

    /// Blank submissions are allowed only where clearing text makes sense
    fn allows_blank(&self) -> bool {
        matches!(self, InputPurpose::EditNoteContent { .. })
    }
}

#[derive(Debug, Clone)]
pub struct InputState {
    pub purpose: InputPurpose,
    pub input: Input,
    pub return_mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Task { id: String },
    Subtask { task_id: String, subtask_id: String },
    Note { id: String },
    Decision { id: String },
    AlterEgo { id: String },
}

pub const CONFIRM_OPTIONS: [&str; 2] = ["Delete", "Cancel"];

#[derive(Debug, Clone)]
pub struct ConfirmState {
    pub target: DeleteTarget,
    pub label: String,
    pub selection: usize,
    pub return_mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailState {
    pub task_id: String,
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NotesState {
    pub items: Vec<StickyNote>,
    pub categories: Vec<NoteCategory>,
    /// Category id the list is narrowed to
    pub filter: Option<String>,
    pub selected: usize,
    pub scroll: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionsState {
    pub entries: Vec<DecisionEntry>,
    /// Index into `Quadrant::ALL`, laid out as a 2x2 grid
    pub quadrant: usize,
    pub selected: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AlterEgoState {
    pub egos: Vec<AlterEgo>,
    pub selected: usize,
    /// Chats with the selected alter ego, most recent first
    pub chats: Vec<Chat>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

/// Key bindings parsed once at startup
#[derive(Debug, Clone)]
pub struct Keymap {
    pub quit: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
    pub new: ParsedKeyBinding,
    pub edit: ParsedKeyBinding,
    pub delete: ParsedKeyBinding,
    pub select: ParsedKeyBinding,
    pub toggle_completion: ParsedKeyBinding,
    pub pick_up: ParsedKeyBinding,
    pub add_subtask: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub day_left: ParsedKeyBinding,
    pub day_right: ParsedKeyBinding,
    pub switch_category: ParsedKeyBinding,
    pub tab_prev: ParsedKeyBinding,
    pub tab_next: ParsedKeyBinding,
    pub tab_1: ParsedKeyBinding,
    pub tab_2: ParsedKeyBinding,
    pub tab_3: ParsedKeyBinding,
    pub tab_4: ParsedKeyBinding,
    pub copy: ParsedKeyBinding,
    pub refresh: ParsedKeyBinding,
    pub write_as_me: ParsedKeyBinding,
    pub write_as_alter_ego: ParsedKeyBinding,
    pub save: ParsedKeyBinding,
    pub cycle_color: ParsedKeyBinding,
}

impl Keymap {
    pub fn from_config(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |name: &str, value: &str| {
            parse_key_binding(value)
                .map_err(|e| TuiError::KeyBindingError(format!("{} = {:?}: {}", name, value, e)))
        };
        Ok(Self {
            quit: parse("quit", &bindings.quit)?,
            help: parse("help", &bindings.help)?,
            new: parse("new", &bindings.new)?,
            edit: parse("edit", &bindings.edit)?,
            delete: parse("delete", &bindings.delete)?,
            select: parse("select", &bindings.select)?,
            toggle_completion: parse("toggle_completion", &bindings.toggle_completion)?,
            pick_up: parse("pick_up", &bindings.pick_up)?,
            add_subtask: parse("add_subtask", &bindings.add_subtask)?,
            list_up: parse("list_up", &bindings.list_up)?,
            list_down: parse("list_down", &bindings.list_down)?,
            day_left: parse("day_left", &bindings.day_left)?,
            day_right: parse("day_right", &bindings.day_right)?,
            switch_category: parse("switch_category", &bindings.switch_category)?,
            tab_prev: parse("tab_prev", &bindings.tab_prev)?,
            tab_next: parse("tab_next", &bindings.tab_next)?,
            tab_1: parse("tab_1", &bindings.tab_1)?,
            tab_2: parse("tab_2", &bindings.tab_2)?,
            tab_3: parse("tab_3", &bindings.tab_3)?,
            tab_4: parse("tab_4", &bindings.tab_4)?,
            copy: parse("copy", &bindings.copy)?,
            refresh: parse("refresh", &bindings.refresh)?,
            write_as_me: parse("write_as_me", &bindings.write_as_me)?,
            write_as_alter_ego: parse("write_as_alter_ego", &bindings.write_as_alter_ego)?,
            save: parse("save", &bindings.save)?,
            cycle_color: parse("cycle_color", &bindings.cycle_color)?,
        })
    }
}

pub struct App {
    // Core infrastructure
    pub config: Config,
    pub board: TaskBoard,
    pub keys: Keymap,

    pub current_tab: Tab,
    pub mode: Mode,

    // Board tab
    pub cursor: BoardCursor,
    pub picked: Option<PickedUp>,
    pub detail: Option<DetailState>,

    // Other tabs
    pub notes: NotesState,
    pub decisions: DecisionsState,
    pub alter_egos: AlterEgoState,

    // Modals
    pub input: Option<InputState>,
    pub confirm: Option<ConfirmState>,

    pub status: StatusState,
    pub last_sync: Option<SyncState>,
}

impl App {
    pub fn new(config: Config, board: TaskBoard) -> Result<Self, TuiError> {
        let keys = Keymap::from_config(&config.key_bindings)?;
        let today_column = board
            .buckets()
            .iter()
            .position(|b| !b.is_past)
            .unwrap_or(0);

        let mut app = Self {
            config,
            board,
            keys,
            current_tab: Tab::Board,
            mode: Mode::View,
            cursor: BoardCursor {
                day: today_column,
                category: Category::Work,
                index: 0,
            },
            picked: None,
            detail: None,
            notes: NotesState::default(),
            decisions: DecisionsState::default(),
            alter_egos: AlterEgoState::default(),
            input: None,
            confirm: None,
            status: StatusState::default(),
            last_sync: None,
        };
        app.load_collections()?;
        Ok(app)
    }

    fn store(&self) -> &Persistence {
        self.board.store()
    }

    /// Load everything except tasks, which the board owns
    fn load_collections(&mut self) -> Result<(), TuiError> {
        self.reload_notes()?;
        self.decisions.entries = self.store().get_decisions()?;
        self.clamp_decision_selection();
        self.alter_egos.egos = self.store().get_alter_egos()?;
        self.clamp_alter_ego_selection();
        self.reload_chats()?;
        Ok(())
    }

    /// Re-read every collection from persistence
    pub fn reload(&mut self) -> Result<(), TuiError> {
        self.picked = None;
        self.board.load()?;
        self.load_collections()?;
        self.clamp_board_cursor();
        self.set_status_message("Reloaded".to_string());
        Ok(())
    }

    // Status line

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared (after 3 seconds)
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    fn report(&mut self, what: &str, sync: SyncState) {
        self.last_sync = Some(sync);
        self.set_status_message(format!("{} ({})", what, sync));
    }

    /// Right-hand side of the status bar
    pub fn sync_label(&self) -> String {
        if !self.store().has_remote() {
            return "local only".to_string();
        }
        let pending = self.board.pending_sync();
        if pending > 0 {
            return format!("{} pending", pending);
        }
        match self.last_sync {
            Some(state) => state.to_string(),
            None => "online".to_string(),
        }
    }

    // Background work

    /// Push moves whose debounce window elapsed and follow the calendar day
    pub fn tick(&mut self, now: Instant) {
        self.tick_at(now, utils::today());
    }

    pub fn tick_at(&mut self, now: Instant, today: NaiveDate) {
        let report = self.board.flush_due(now);
        self.note_sync_report(&report);
        if today != self.board.today() {
            tracing::info!(%today, "day rolled over");
            self.board.refresh(today);
            self.clamp_board_cursor();
        }
    }

    fn note_sync_report(&mut self, report: &SyncReport) {
        if report.failed > 0 {
            self.last_sync = Some(SyncState::LocalOnly);
            self.set_status_message(format!(
                "{} moved task(s) kept locally; remote push failed",
                report.failed
            ));
        } else if report.pushed > 0 {
            self.last_sync = Some(SyncState::Remote);
        }
    }

    /// Push every pending move before the UI goes away
    pub fn shutdown(&mut self) -> SyncReport {
        let report = self.board.flush_all();
        if report.failed > 0 {
            tracing::warn!(failed = report.failed, "moves left unsynced at exit");
        }
        report
    }

    // Tabs and modes

    pub fn switch_tab(&mut self, tab: Tab) {
        if self.mode == Mode::View {
            self.current_tab = tab;
        }
    }

    pub fn enter_help_mode(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.mode = Mode::View;
    }

    // Board navigation

    pub fn day_count(&self) -> usize {
        self.board.buckets().len()
    }

    pub fn column_len(&self, day: usize, category: Category) -> usize {
        self.board
            .buckets()
            .get(day)
            .map(|b| b.column(category).len())
            .unwrap_or(0)
    }

    /// Highest cursor index in the current column. While a task is held the
    /// slot after the last entry is a valid drop point.
    fn max_index(&self) -> usize {
        let len = self.column_len(self.cursor.day, self.cursor.category);
        if self.picked.is_some() {
            len
        } else {
            len.saturating_sub(1)
        }
    }

    pub fn clamp_board_cursor(&mut self) {
        let days = self.day_count();
        self.cursor.day = self.cursor.day.min(days.saturating_sub(1));
        self.cursor.index = self.cursor.index.min(self.max_index());
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let bucket = self.board.buckets().get(self.cursor.day)?;
        bucket
            .column(self.cursor.category)
            .entries()
            .get(self.cursor.index)
            .map(|(_, task)| *task)
    }

    pub fn board_up(&mut self) {
        self.cursor.index = self.cursor.index.saturating_sub(1);
    }

    pub fn board_down(&mut self) {
        self.cursor.index = (self.cursor.index + 1).min(self.max_index());
    }

    pub fn board_left(&mut self) {
        self.cursor.day = self.cursor.day.saturating_sub(1);
        self.clamp_board_cursor();
    }

    pub fn board_right(&mut self) {
        if self.cursor.day + 1 < self.day_count() {
            self.cursor.day += 1;
        }
        self.clamp_board_cursor();
    }

    pub fn switch_board_category(&mut self) {
        self.cursor.category = self.cursor.category.other();
        self.clamp_board_cursor();
    }

    /// Put the cursor on a task wherever it sits on the board
    pub fn focus_task(&mut self, id: &str) {
        for (day, bucket) in self.board.buckets().iter().enumerate() {
            for category in Category::ALL {
                if let Some(index) = bucket
                    .column(category)
                    .entries()
                    .iter()
                    .position(|(_, t)| t.id == id)
                {
                    self.cursor = BoardCursor {
                        day,
                        category,
                        index,
                    };
                    return;
                }
            }
        }
        self.clamp_board_cursor();
    }

    // Board actions

    fn apply_outcome(&mut self, outcome: ActionOutcome, what: &str) {
        match outcome {
            ActionOutcome::Saved(saved) => {
                self.focus_task(&saved.record.id);
                self.report(what, saved.sync);
            }
            ActionOutcome::Rejected(reason) => self.set_status_message(reason),
            ActionOutcome::Selected(_) => {}
        }
    }

    pub fn toggle_selected_completion(&mut self, now: Instant) {
        let Some(task_id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        let outcome = self
            .board
            .handle(BoardAction::ToggleCompletion { task_id }, now);
        self.apply_outcome(outcome, "Task updated");
    }

    pub fn start_new_task(&mut self) {
        let purpose = InputPurpose::NewTask {
            day: self.cursor.day,
            category: self.cursor.category,
        };
        self.begin_input(purpose, "");
    }

    pub fn start_edit_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let purpose = InputPurpose::EditTask {
            task_id: task.id.clone(),
        };
        let text = task.text.clone();
        self.begin_input(purpose, &text);
    }

    pub fn request_delete_task(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let target = DeleteTarget::Task { id: task.id.clone() };
        let label = task.text.clone();
        self.request_delete(target, label);
    }

    pub fn pick_up_or_drop(&mut self, now: Instant) {
        if self.picked.is_some() {
            self.drop_task(now);
        } else {
            self.pick_up();
        }
    }

    pub fn pick_up(&mut self) {
        let Some(bucket) = self.board.buckets().get(self.cursor.day) else {
            return;
        };
        let column = bucket.column(self.cursor.category);
        let Some((section, task)) = column.entries().get(self.cursor.index).copied() else {
            return;
        };
        let picked = PickedUp {
            task_id: task.id.clone(),
            text: task.text.clone(),
            from_day: self.cursor.day,
            from_category: self.cursor.category,
            source_index: self.cursor.index,
            section,
            completed: task.completed,
        };
        let message = format!("Moving \"{}\": pick a slot and drop", truncate(&picked.text, 30));
        self.picked = Some(picked);
        self.set_status_message(message);
    }

    pub fn cancel_pick_up(&mut self) {
        if self.picked.take().is_some() {
            self.clamp_board_cursor();
            self.set_status_message("Move cancelled".to_string());
        }
    }

    /// Index inside the section the held task will land in, counting the
    /// entries of that section above the cursor
    pub fn drop_target_index(&self, picked: &PickedUp) -> usize {
        let Some(bucket) = self.board.buckets().get(self.cursor.day) else {
            return 0;
        };
        let section = if picked.from_day == self.cursor.day {
            picked.section
        } else if picked.completed {
            Section::Completed
        } else {
            Section::Todo
        };
        bucket
            .column(self.cursor.category)
            .entries()
            .iter()
            .take(self.cursor.index)
            .filter(|(s, t)| *s == section && t.id != picked.task_id)
            .count()
    }

    pub fn drop_task(&mut self, now: Instant) {
        let Some(picked) = self.picked.take() else {
            return;
        };
        let request = MoveRequest {
            task_id: picked.task_id.clone(),
            from_day: picked.from_day,
            to_day: self.cursor.day,
            from_category: picked.from_category,
            to_category: self.cursor.category,
            source_index: Some(picked.source_index),
            target_index: self.drop_target_index(&picked),
        };
        let outcome = self.board.handle(BoardAction::MoveTask(request), now);
        if let ActionOutcome::Rejected(reason) = &outcome {
            let message = format!("Move rejected: {}", reason);
            self.set_status_message(message);
            self.clamp_board_cursor();
            return;
        }
        self.apply_outcome(outcome, "Task moved");
    }

    // Task detail

    pub fn open_detail(&mut self, now: Instant) {
        let Some(task_id) = self.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        match self.board.handle(BoardAction::TaskClick { task_id }, now) {
            ActionOutcome::Selected(task) => {
                self.detail = Some(DetailState {
                    task_id: task.id,
                    selected: 0,
                });
                self.mode = Mode::TaskDetail;
            }
            ActionOutcome::Rejected(reason) => self.set_status_message(reason),
            ActionOutcome::Saved(_) => {}
        }
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.mode = Mode::View;
    }

    pub fn detail_task(&self) -> Option<&Task> {
        self.detail
            .as_ref()
            .and_then(|d| self.board.task(&d.task_id))
    }

    fn subtask_count(&self) -> usize {
        self.detail_task().map(|t| t.subtasks.len()).unwrap_or(0)
    }

    pub fn detail_up(&mut self) {
        if let Some(detail) = self.detail.as_mut() {
            detail.selected = detail.selected.saturating_sub(1);
        }
    }

    pub fn detail_down(&mut self) {
        let count = self.subtask_count();
        if let Some(detail) = self.detail.as_mut() {
            detail.selected = (detail.selected + 1).min(count.saturating_sub(1));
        }
    }

    fn selected_subtask_id(&self) -> Option<(String, String)> {
        let detail = self.detail.as_ref()?;
        let task = self.board.task(&detail.task_id)?;
        let subtask = task.subtasks.get(detail.selected)?;
        Some((task.id.clone(), subtask.id.clone()))
    }

    pub fn detail_toggle_subtask(&mut self) -> Result<(), TuiError> {
        let Some((task_id, subtask_id)) = self.selected_subtask_id() else {
            return Ok(());
        };
        let saved = self.board.toggle_subtask(&task_id, &subtask_id)?;
        self.report("Subtask updated", saved.sync);
        Ok(())
    }

    pub fn detail_add_subtask(&mut self) {
        if let Some(detail) = self.detail.as_ref() {
            let purpose = InputPurpose::AddSubtask {
                task_id: detail.task_id.clone(),
            };
            self.begin_input(purpose, "");
        }
    }

    pub fn detail_edit_task(&mut self) {
        let Some(task) = self.detail_task() else {
            return;
        };
        let purpose = InputPurpose::EditTask {
            task_id: task.id.clone(),
        };
        let text = task.text.clone();
        self.begin_input(purpose, &text);
    }

    pub fn detail_toggle_task(&mut self, now: Instant) {
        let Some(task_id) = self.detail.as_ref().map(|d| d.task_id.clone()) else {
            return;
        };
        let outcome = self
            .board
            .handle(BoardAction::ToggleCompletion { task_id }, now);
        self.apply_outcome(outcome, "Task updated");
    }

    pub fn request_delete_subtask(&mut self) {
        let Some((task_id, subtask_id)) = self.selected_subtask_id() else {
            return;
        };
        let label = self
            .detail_task()
            .and_then(|t| t.subtasks.iter().find(|s| s.id == subtask_id))
            .map(|s| s.text.clone())
            .unwrap_or_default();
        self.request_delete(DeleteTarget::Subtask { task_id, subtask_id }, label);
    }

    // Prompts

    pub fn begin_input(&mut self, purpose: InputPurpose, prefill: &str) {
        let input = Input::from_string(prefill, purpose.multiline());
        self.input = Some(InputState {
            purpose,
            input,
            return_mode: self.mode,
        });
        self.mode = Mode::Input;
    }

    pub fn cancel_input(&mut self) {
        if let Some(state) = self.input.take() {
            self.mode = state.return_mode;
        } else {
            self.mode = Mode::View;
        }
    }

    pub fn submit_input(&mut self) -> Result<(), TuiError> {
        let Some(state) = self.input.take() else {
            return Ok(());
        };
        self.mode = state.return_mode;
        if state.input.is_blank() && !state.purpose.allows_blank() {
            self.set_status_message("Nothing to save".to_string());
            return Ok(());
        }
        let text = state.input.value();
        let trimmed = text.trim();

        match state.purpose {
            InputPurpose::NewTask { day, category } => {
                let saved = self.board.add_task(trimmed, category, Some(day))?;
                self.focus_task(&saved.record.id);
                self.report("Task added", saved.sync);
            }
            InputPurpose::EditTask { task_id } => {
                let saved = self.board.edit_task(&task_id, trimmed)?;
                self.report("Task updated", saved.sync);
            }
            InputPurpose::AddSubtask { task_id } => {
                let saved = self.board.add_subtask(&task_id, trimmed)?;
                let last = saved.record.subtasks.len().saturating_sub(1);
                if let Some(detail) = self.detail.as_mut() {
                    detail.selected = last;
                }
                self.report("Subtask added", saved.sync);
            }
            InputPurpose::NewNote => {
                let mut note = StickyNote::new(trimmed.to_string());
                note.category_id = self.notes.filter.clone();
                let saved = self.store().save_note(note)?;
                self.reload_notes()?;
                self.select_note(&saved.record.id);
                self.report("Note added", saved.sync);
            }
            InputPurpose::EditNoteTitle { note_id } => {
                let title = trimmed.to_string();
                self.update_note(&note_id, "Note renamed", |note| note.title = title)?;
            }
            InputPurpose::EditNoteContent { note_id } => {
                self.update_note(&note_id, "Note saved", |note| note.content = text)?;
            }
            InputPurpose::NewDecision { quadrant } => {
                let entry = DecisionEntry::new(trimmed.to_string(), quadrant, self.board.today());
                let saved = self.store().save_decision(entry)?;
                self.reload_decisions()?;
                self.select_decision(&saved.record.id);
                self.report("Decision added", saved.sync);
            }
            InputPurpose::EditDecision { entry_id } => {
                let Some(mut entry) = self
                    .decisions
                    .entries
                    .iter()
                    .find(|e| e.id == entry_id)
                    .cloned()
                else {
                    return Ok(());
                };
                entry.title = trimmed.to_string();
                let saved = self.store().save_decision(entry)?;
                self.reload_decisions()?;
                self.select_decision(&saved.record.id);
                self.report("Decision updated", saved.sync);
            }
            InputPurpose::NewAlterEgo => {
                let saved = self.store().save_alter_ego(AlterEgo::new(trimmed.to_string()))?;
                self.alter_egos.egos = self.store().get_alter_egos()?;
                if let Some(index) = self
                    .alter_egos
                    .egos
                    .iter()
                    .position(|e| e.id == saved.record.id)
                {
                    self.alter_egos.selected = index;
                }
                self.reload_chats()?;
                self.report("Alter ego added", saved.sync);
            }
            InputPurpose::ChatMessage {
                alter_ego_id,
                sender,
            } => {
                self.send_chat_message(&alter_ego_id, sender, trimmed)?;
            }
        }
        Ok(())
    }

    // Delete confirmation

    pub fn request_delete(&mut self, target: DeleteTarget, label: String) {
        self.confirm = Some(ConfirmState {
            target,
            label,
            selection: 0,
            return_mode: self.mode,
        });
        self.mode = Mode::ConfirmDelete;
    }

    pub fn toggle_confirm_selection(&mut self) {
        if let Some(confirm) = self.confirm.as_mut() {
            confirm.selection = (confirm.selection + 1) % CONFIRM_OPTIONS.len();
        }
    }

    pub fn cancel_confirm(&mut self) {
        if let Some(confirm) = self.confirm.take() {
            self.mode = confirm.return_mode;
        } else {
            self.mode = Mode::View;
        }
    }

    pub fn confirm_selected(&mut self) -> Result<(), TuiError> {
        let Some(confirm) = self.confirm.take() else {
            return Ok(());
        };
        self.mode = confirm.return_mode;
        if confirm.selection != 0 {
            return Ok(());
        }

        match confirm.target {
            DeleteTarget::Task { id } => {
                self.board.delete_task(&id)?;
                if self.detail.as_ref().is_some_and(|d| d.task_id == id) {
                    self.close_detail();
                }
                self.clamp_board_cursor();
                self.set_status_message("Task deleted".to_string());
            }
            DeleteTarget::Subtask {
                task_id,
                subtask_id,
            } => {
                let saved = self.board.delete_subtask(&task_id, &subtask_id)?;
                let count = saved.record.subtasks.len();
                if let Some(detail) = self.detail.as_mut() {
                    detail.selected = detail.selected.min(count.saturating_sub(1));
                }
                self.report("Subtask deleted", saved.sync);
            }
            DeleteTarget::Note { id } => {
                self.store().delete_note(&id)?;
                self.reload_notes()?;
                self.set_status_message("Note deleted".to_string());
            }
            DeleteTarget::Decision { id } => {
                self.store().delete_decision(&id)?;
                self.reload_decisions()?;
                self.set_status_message("Decision deleted".to_string());
            }
            DeleteTarget::AlterEgo { id } => {
                self.store().delete_alter_ego(&id)?;
                self.alter_egos.egos = self.store().get_alter_egos()?;
                self.clamp_alter_ego_selection();
                self.reload_chats()?;
                self.set_status_message("Alter ego and chats deleted".to_string());
            }
        }
        Ok(())
    }

    // Notes

    pub fn reload_notes(&mut self) -> Result<(), TuiError> {
        self.notes.items = self.store().get_notes()?;
        self.notes.categories = self.store().get_note_categories()?;
        let filter_known = self
            .notes
            .filter
            .as_ref()
            .is_none_or(|id| self.notes.categories.iter().any(|c| &c.id == id));
        if !filter_known {
            self.notes.filter = None;
        }
        let count = self.visible_notes().len();
        self.notes.selected = self.notes.selected.min(count.saturating_sub(1));
        Ok(())
    }

    pub fn visible_notes(&self) -> Vec<&StickyNote> {
        self.notes
            .items
            .iter()
            .filter(|n| match &self.notes.filter {
                Some(id) => n.category_id.as_ref() == Some(id),
                None => true,
            })
            .collect()
    }

    pub fn selected_note(&self) -> Option<&StickyNote> {
        self.visible_notes().get(self.notes.selected).copied()
    }

    pub fn note_category(&self, note: &StickyNote) -> Option<&NoteCategory> {
        let id = note.category_id.as_ref()?;
        self.notes.categories.iter().find(|c| &c.id == id)
    }

    pub fn filter_label(&self) -> String {
        self.notes
            .filter
            .as_ref()
            .and_then(|id| self.notes.categories.iter().find(|c| &c.id == id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "All".to_string())
    }

    fn select_note(&mut self, id: &str) {
        let index = self.visible_notes().iter().position(|n| n.id == id);
        if let Some(index) = index {
            self.notes.selected = index;
            self.notes.scroll = 0;
        }
    }

    pub fn notes_up(&mut self) {
        self.notes.selected = self.notes.selected.saturating_sub(1);
        self.notes.scroll = 0;
    }

    pub fn notes_down(&mut self) {
        let count = self.visible_notes().len();
        self.notes.selected = (self.notes.selected + 1).min(count.saturating_sub(1));
        self.notes.scroll = 0;
    }

    pub fn scroll_note(&mut self, down: bool) {
        self.notes.scroll = if down {
            self.notes.scroll.saturating_add(5)
        } else {
            self.notes.scroll.saturating_sub(5)
        };
    }

    /// All, then each category in turn
    pub fn cycle_note_filter(&mut self) {
        let categories = &self.notes.categories;
        self.notes.filter = match &self.notes.filter {
            None => categories.first().map(|c| c.id.clone()),
            Some(id) => categories
                .iter()
                .position(|c| &c.id == id)
                .and_then(|i| categories.get(i + 1))
                .map(|c| c.id.clone()),
        };
        self.notes.selected = 0;
        self.notes.scroll = 0;
    }

    fn update_note<F>(&mut self, id: &str, what: &str, change: F) -> Result<(), TuiError>
    where
        F: FnOnce(&mut StickyNote),
    {
        let Some(mut note) = self.notes.items.iter().find(|n| n.id == id).cloned() else {
            return Ok(());
        };
        change(&mut note);
        let saved = self.store().save_note(note)?;
        self.reload_notes()?;
        self.select_note(&saved.record.id);
        self.report(what, saved.sync);
        Ok(())
    }

    pub fn start_new_note(&mut self) {
        self.begin_input(InputPurpose::NewNote, "");
    }

    pub fn start_edit_note_title(&mut self) {
        let Some(note) = self.selected_note() else {
            return;
        };
        let purpose = InputPurpose::EditNoteTitle {
            note_id: note.id.clone(),
        };
        let title = note.title.clone();
        self.begin_input(purpose, &title);
    }

    pub fn start_edit_note_content(&mut self) {
        let Some(note) = self.selected_note() else {
            return;
        };
        let purpose = InputPurpose::EditNoteContent {
            note_id: note.id.clone(),
        };
        let content = note.content.clone();
        self.begin_input(purpose, &content);
    }

    pub fn toggle_note_pin(&mut self) -> Result<(), TuiError> {
        let Some(id) = self.selected_note().map(|n| n.id.clone()) else {
            return Ok(());
        };
        self.update_note(&id, "Pin toggled", |note| note.pinned = !note.pinned)
    }

    pub fn cycle_note_color(&mut self) -> Result<(), TuiError> {
        let Some(id) = self.selected_note().map(|n| n.id.clone()) else {
            return Ok(());
        };
        self.update_note(&id, "Colour changed", |note| {
            note.color = next_note_color(&note.color).to_string();
        })
    }

    pub fn copy_selected_note(&mut self) {
        let Some(text) = self.selected_note().map(note_clipboard_text) else {
            return;
        };
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.set_status_message("Note copied to clipboard".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard unavailable");
                self.set_status_message(format!("Failed to copy: {}", e));
            }
        }
    }

    pub fn request_delete_note(&mut self) {
        let Some(note) = self.selected_note() else {
            return;
        };
        let target = DeleteTarget::Note { id: note.id.clone() };
        let label = note.title.clone();
        self.request_delete(target, label);
    }

    // Decisions

    pub fn reload_decisions(&mut self) -> Result<(), TuiError> {
        self.decisions.entries = self.store().get_decisions()?;
        self.clamp_decision_selection();
        Ok(())
    }

    pub fn selected_quadrant(&self) -> Quadrant {
        Quadrant::ALL[self.decisions.quadrant.min(Quadrant::ALL.len() - 1)]
    }

    /// Entries of one quadrant, newest first
    pub fn decisions_in(&self, quadrant: Quadrant) -> Vec<&DecisionEntry> {
        group_by_quadrant(&self.decisions.entries)
            .into_iter()
            .find(|(q, _)| *q == quadrant)
            .map(|(_, entries)| entries)
            .unwrap_or_default()
    }

    pub fn selected_decision(&self) -> Option<&DecisionEntry> {
        self.decisions_in(self.selected_quadrant())
            .get(self.decisions.selected)
            .copied()
    }

    fn clamp_decision_selection(&mut self) {
        let count = self.decisions_in(self.selected_quadrant()).len();
        self.decisions.selected = self.decisions.selected.min(count.saturating_sub(1));
    }

    fn select_decision(&mut self, id: &str) {
        let Some(entry) = self.decisions.entries.iter().find(|e| e.id == id) else {
            return;
        };
        let quadrant = entry.quadrant();
        if let Some(q) = Quadrant::ALL.iter().position(|q| *q == quadrant) {
            self.decisions.quadrant = q;
        }
        let index = self.decisions_in(quadrant).iter().position(|e| e.id == id);
        if let Some(index) = index {
            self.decisions.selected = index;
        }
    }

    fn focus_quadrant(&mut self, quadrant: usize, selected: usize) {
        self.decisions.quadrant = quadrant;
        self.decisions.selected = selected;
        self.clamp_decision_selection();
    }

    /// Up within the quadrant, spilling into the quadrant above
    pub fn decisions_up(&mut self) {
        if self.decisions.selected > 0 {
            self.decisions.selected -= 1;
        } else if self.decisions.quadrant >= 2 {
            let above = self.decisions.quadrant - 2;
            let last = self.decisions_in(Quadrant::ALL[above]).len().saturating_sub(1);
            self.focus_quadrant(above, last);
        }
    }

    /// Down within the quadrant, spilling into the quadrant below
    pub fn decisions_down(&mut self) {
        let count = self.decisions_in(self.selected_quadrant()).len();
        if self.decisions.selected + 1 < count {
            self.decisions.selected += 1;
        } else if self.decisions.quadrant < 2 {
            self.focus_quadrant(self.decisions.quadrant + 2, 0);
        }
    }

    pub fn decisions_left(&mut self) {
        if self.decisions.quadrant % 2 == 1 {
            self.focus_quadrant(self.decisions.quadrant - 1, self.decisions.selected);
        }
    }

    pub fn decisions_right(&mut self) {
        if self.decisions.quadrant % 2 == 0 {
            self.focus_quadrant(self.decisions.quadrant + 1, self.decisions.selected);
        }
    }

    pub fn next_quadrant(&mut self) {
        self.focus_quadrant((self.decisions.quadrant + 1) % Quadrant::ALL.len(), 0);
    }

    pub fn start_new_decision(&mut self) {
        let quadrant = self.selected_quadrant();
        self.begin_input(InputPurpose::NewDecision { quadrant }, "");
    }

    pub fn start_edit_decision(&mut self) {
        let Some(entry) = self.selected_decision() else {
            return;
        };
        let purpose = InputPurpose::EditDecision {
            entry_id: entry.id.clone(),
        };
        let title = entry.title.clone();
        self.begin_input(purpose, &title);
    }

    pub fn request_delete_decision(&mut self) {
        let Some(entry) = self.selected_decision() else {
            return;
        };
        let target = DeleteTarget::Decision {
            id: entry.id.clone(),
        };
        let label = entry.title.clone();
        self.request_delete(target, label);
    }

    // Alter egos

    pub fn selected_alter_ego(&self) -> Option<&AlterEgo> {
        self.alter_egos.egos.get(self.alter_egos.selected)
    }

    /// The chat new messages go to
    pub fn current_chat(&self) -> Option<&Chat> {
        self.alter_egos.chats.first()
    }

    fn clamp_alter_ego_selection(&mut self) {
        let count = self.alter_egos.egos.len();
        self.alter_egos.selected = self.alter_egos.selected.min(count.saturating_sub(1));
    }

    pub fn reload_chats(&mut self) -> Result<(), TuiError> {
        self.alter_egos.chats = match self.selected_alter_ego() {
            Some(ego) => self.store().get_chats_for(&ego.id)?,
            None => Vec::new(),
        };
        Ok(())
    }

    pub fn alter_egos_up(&mut self) -> Result<(), TuiError> {
        self.alter_egos.selected = self.alter_egos.selected.saturating_sub(1);
        self.reload_chats()
    }

    pub fn alter_egos_down(&mut self) -> Result<(), TuiError> {
        let count = self.alter_egos.egos.len();
        self.alter_egos.selected = (self.alter_egos.selected + 1).min(count.saturating_sub(1));
        self.reload_chats()
    }

    pub fn start_new_alter_ego(&mut self) {
        self.begin_input(InputPurpose::NewAlterEgo, "");
    }

    pub fn start_chat_message(&mut self, sender: Sender) {
        let Some(ego) = self.selected_alter_ego() else {
            self.set_status_message("Create an alter ego first".to_string());
            return;
        };
        let purpose = InputPurpose::ChatMessage {
            alter_ego_id: ego.id.clone(),
            sender,
        };
        self.begin_input(purpose, "");
    }

    /// Append to the most recent chat with the alter ego, starting one if
    /// there is none
    pub fn send_chat_message(
        &mut self,
        alter_ego_id: &str,
        sender: Sender,
        text: &str,
    ) -> Result<(), TuiError> {
        let existing = self
            .store()
            .get_chats_for(alter_ego_id)?
            .into_iter()
            .next();
        let mut chat = existing
            .unwrap_or_else(|| Chat::new(alter_ego_id.to_string(), truncate(text, 40)));
        chat.push_message(sender, text.to_string());
        let saved = self.store().save_chat(chat)?;
        self.reload_chats()?;
        self.report("Message sent", saved.sync);
        Ok(())
    }

    pub fn request_delete_alter_ego(&mut self) {
        let Some(ego) = self.selected_alter_ego() else {
            return;
        };
        let target = DeleteTarget::AlterEgo { id: ego.id.clone() };
        let label = ego.name.clone();
        self.request_delete(target, label);
    }

    // Key hints

    fn hint(&self, binding: &str, action: &str) -> String {
        format!("{} {}", format_key_binding_for_display(binding), action)
    }

    pub fn key_hints(&self) -> Vec<String> {
        let kb = &self.config.key_bindings;
        match self.mode {
            Mode::Help => vec![self.hint("Esc", "close help")],
            Mode::ConfirmDelete => vec![
                "↑/↓ choose".to_string(),
                "Enter confirm".to_string(),
                "Esc cancel".to_string(),
            ],
            Mode::Input => {
                let multiline = self.input.as_ref().is_some_and(|s| s.input.multiline);
                if multiline {
                    vec![self.hint(&kb.save, "save"), "Esc cancel".to_string()]
                } else {
                    vec!["Enter save".to_string(), "Esc cancel".to_string()]
                }
            }
            Mode::TaskDetail => vec![
                self.hint(&kb.toggle_completion, "toggle subtask"),
                self.hint(&kb.add_subtask, "add subtask"),
                self.hint(&kb.delete, "delete subtask"),
                self.hint(&kb.edit, "edit task"),
                self.hint(&kb.select, "complete task"),
                "Esc back".to_string(),
            ],
            Mode::View => match self.current_tab {
                Tab::Board if self.picked.is_some() => vec![
                    self.hint(&format!("{}/{}", kb.day_left, kb.day_right), "day"),
                    self.hint(&format!("{}/{}", kb.list_up, kb.list_down), "slot"),
                    self.hint(&kb.switch_category, "category"),
                    self.hint(&kb.pick_up, "drop"),
                    "Esc cancel".to_string(),
                ],
                Tab::Board => vec![
                    self.hint(&kb.new, "new"),
                    self.hint(&kb.toggle_completion, "done"),
                    self.hint(&kb.pick_up, "move"),
                    self.hint(&kb.select, "details"),
                    self.hint(&kb.edit, "edit"),
                    self.hint(&kb.delete, "delete"),
                    self.hint(&kb.switch_category, "category"),
                    self.hint(&kb.help, "help"),
                    self.hint(&kb.quit, "quit"),
                ],
                Tab::Notes => vec![
                    self.hint(&kb.new, "new"),
                    self.hint(&kb.select, "write"),
                    self.hint(&kb.edit, "rename"),
                    self.hint(&kb.toggle_completion, "pin"),
                    self.hint(&kb.cycle_color, "colour"),
                    self.hint(&kb.copy, "copy"),
                    self.hint(&kb.switch_category, "category"),
                    self.hint(&kb.delete, "delete"),
                    self.hint(&kb.quit, "quit"),
                ],
                Tab::Decisions => vec![
                    self.hint(&kb.new, "new"),
                    self.hint(&kb.edit, "edit"),
                    self.hint(&kb.delete, "delete"),
                    self.hint(&kb.switch_category, "quadrant"),
                    self.hint(&kb.help, "help"),
                    self.hint(&kb.quit, "quit"),
                ],
                Tab::AlterEgos => vec![
                    self.hint(&kb.new, "new alter ego"),
                    self.hint(&kb.write_as_me, "write as me"),
                    self.hint(&kb.write_as_alter_ego, "write as them"),
                    self.hint(&kb.delete, "delete"),
                    self.hint(&kb.quit, "quit"),
                ],
            },
        }
    }
}

/// Plain text put on the clipboard for a note
pub fn note_clipboard_text(note: &StickyNote) -> String {
    if note.content.trim().is_empty() {
        note.title.clone()
    } else {
        format!("{}\n\n{}", note.title, note.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::store::{LocalStore, MemoryRemote};
    use chrono::Days;

    fn app_with(store: Persistence) -> App {
        let mut board = TaskBoard::new(store, &BoardConfig::default());
        board.load().unwrap();
        App::new(Config::default(), board).unwrap()
    }

    fn empty_app() -> App {
        let store = Persistence::local_only(LocalStore::in_memory().unwrap(), "u1").with_seeding(false);
        app_with(store)
    }

    fn type_text(app: &mut App, text: &str) {
        let state = app.input.as_mut().unwrap();
        for c in text.chars() {
            state.input.insert_char(c);
        }
    }

    fn add_task(app: &mut App, text: &str) -> String {
        app.start_new_task();
        type_text(app, text);
        app.submit_input().unwrap();
        app.selected_task().unwrap().id.clone()
    }

    #[test]
    fn cursor_starts_on_today() {
        let app = empty_app();
        assert_eq!(app.cursor.day, 0);
        assert_eq!(app.board.buckets()[app.cursor.day].date, app.board.today());
        assert_eq!(app.mode, Mode::View);
    }

    #[test]
    fn adding_a_task_focuses_it() {
        let mut app = empty_app();
        app.board_right();
        app.switch_board_category();
        let id = add_task(&mut app, "Write report");

        let task = app.board.task(&id).unwrap();
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.start_date, app.board.today().checked_add_days(Days::new(1)));
        assert_eq!(app.cursor.day, 1);
        assert_eq!(app.mode, Mode::View);
        assert!(app.status.message.as_deref().unwrap().contains("saved locally"));
    }

    #[test]
    fn blank_prompt_saves_nothing() {
        let mut app = empty_app();
        app.start_new_task();
        type_text(&mut app, "   ");
        app.submit_input().unwrap();
        assert!(app.board.tasks().is_empty());
        assert_eq!(app.status.message.as_deref(), Some("Nothing to save"));
    }

    #[test]
    fn cancelled_prompt_returns_to_previous_mode() {
        let mut app = empty_app();
        app.start_new_note();
        assert_eq!(app.mode, Mode::Input);
        app.cancel_input();
        assert_eq!(app.mode, Mode::View);
        assert!(app.input.is_none());
    }

    #[test]
    fn toggling_completion_moves_task_to_completed() {
        let mut app = empty_app();
        let id = add_task(&mut app, "Stretch");
        app.toggle_selected_completion(Instant::now());
        assert!(app.board.task(&id).unwrap().completed);
        assert_eq!(app.selected_task().unwrap().id, id);
    }

    #[test]
    fn pick_up_and_drop_moves_to_another_day() {
        let mut app = empty_app();
        let id = add_task(&mut app, "Call bank");
        app.pick_up();
        assert!(app.picked.is_some());
        app.board_right();
        app.board_right();
        app.switch_board_category();
        app.drop_task(Instant::now());

        let task = app.board.task(&id).unwrap();
        let target = app.board.today().checked_add_days(Days::new(2));
        assert_eq!(task.start_date, target);
        assert_eq!(task.category, Category::Personal);
        assert!(app.picked.is_none());
        assert_eq!(app.cursor.day, 2);
        assert_eq!(app.selected_task().unwrap().id, id);
    }

    #[test]
    fn drop_reorders_within_a_column() {
        let mut app = empty_app();
        let first = add_task(&mut app, "first");
        add_task(&mut app, "second");
        let third = add_task(&mut app, "third");
        assert_eq!(app.cursor.index, 2);

        app.pick_up();
        app.cursor.index = 0;
        app.drop_task(Instant::now());

        let bucket = &app.board.buckets()[0];
        let order: Vec<&str> = bucket
            .column(Category::Work)
            .entries()
            .iter()
            .map(|(_, t)| t.id.as_str())
            .collect();
        assert_eq!(order[0], third);
        assert_eq!(order[1], first);
        assert_eq!(app.cursor.index, 0);
    }

    #[test]
    fn drop_target_skips_other_sections_and_the_held_task() {
        let mut app = empty_app();
        let done = add_task(&mut app, "done");
        app.toggle_selected_completion(Instant::now());
        app.focus_task(&done);
        add_task(&mut app, "open");
        app.board_right();
        let later = add_task(&mut app, "later");

        // Hold the open task from today and aim below "later" tomorrow
        app.cursor = BoardCursor {
            day: 0,
            category: Category::Work,
            index: 0,
        };
        app.pick_up();
        app.board_right();
        app.board_down();
        let picked = app.picked.clone().unwrap();
        assert_eq!(app.drop_target_index(&picked), 1);
        app.drop_task(Instant::now());

        let column = app.board.buckets()[1].column(Category::Work);
        let order: Vec<&str> = column.entries().iter().map(|(_, t)| t.text.as_str()).collect();
        assert_eq!(order, vec!["later", "open"]);
        assert_eq!(app.board.task(&later).unwrap().position, 0);
    }

    #[test]
    fn cancelling_a_pick_up_leaves_the_board_alone() {
        let mut app = empty_app();
        let id = add_task(&mut app, "stay");
        app.pick_up();
        app.board_right();
        app.cancel_pick_up();
        assert!(app.picked.is_none());
        assert_eq!(app.board.task(&id).unwrap().start_date, Some(app.board.today()));
    }

    #[test]
    fn task_detail_manages_subtasks() {
        let mut app = empty_app();
        let id = add_task(&mut app, "Plan trip");
        app.open_detail(Instant::now());
        assert_eq!(app.mode, Mode::TaskDetail);

        app.detail_add_subtask();
        type_text(&mut app, "Book hotel");
        app.submit_input().unwrap();
        assert_eq!(app.mode, Mode::TaskDetail);
        app.detail_add_subtask();
        type_text(&mut app, "Pack");
        app.submit_input().unwrap();
        assert_eq!(app.detail.as_ref().unwrap().selected, 1);

        app.detail_toggle_subtask().unwrap();
        app.detail_up();
        app.detail_toggle_subtask().unwrap();
        assert!(app.board.task(&id).unwrap().completed);

        app.request_delete_subtask();
        assert_eq!(app.mode, Mode::ConfirmDelete);
        app.confirm_selected().unwrap();
        assert_eq!(app.mode, Mode::TaskDetail);
        assert_eq!(app.board.task(&id).unwrap().subtasks.len(), 1);

        app.close_detail();
        assert_eq!(app.mode, Mode::View);
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut app = empty_app();
        let id = add_task(&mut app, "Temporary");

        app.request_delete_task();
        app.toggle_confirm_selection();
        app.confirm_selected().unwrap();
        assert!(app.board.task(&id).is_some());

        app.request_delete_task();
        assert_eq!(app.confirm.as_ref().unwrap().label, "Temporary");
        app.confirm_selected().unwrap();
        assert!(app.board.task(&id).is_none());
        assert_eq!(app.mode, Mode::View);
    }

    #[test]
    fn notes_can_be_added_written_pinned_and_recoloured() {
        let mut app = empty_app();
        app.current_tab = Tab::Notes;
        app.start_new_note();
        type_text(&mut app, "Groceries");
        app.submit_input().unwrap();

        app.start_edit_note_content();
        assert!(app.input.as_ref().unwrap().input.multiline);
        type_text(&mut app, "- milk\n- eggs");
        app.submit_input().unwrap();

        let note = app.selected_note().unwrap().clone();
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "- milk\n- eggs");

        app.toggle_note_pin().unwrap();
        assert!(app.selected_note().unwrap().pinned);
        let before = app.selected_note().unwrap().color.clone();
        app.cycle_note_color().unwrap();
        assert_eq!(app.selected_note().unwrap().color, next_note_color(&before));
    }

    #[test]
    fn note_filter_cycles_through_categories() {
        let store = Persistence::local_only(LocalStore::in_memory().unwrap(), "u1").with_seeding(false);
        let work = NoteCategory::new("Work".to_string(), "blue".to_string());
        store.save_note_category(work.clone()).unwrap();
        let mut tagged = StickyNote::new("Standup".to_string());
        tagged.category_id = Some(work.id.clone());
        store.save_note(tagged).unwrap();
        store.save_note(StickyNote::new("Loose".to_string())).unwrap();

        let mut app = app_with(store);
        assert_eq!(app.visible_notes().len(), 2);
        app.cycle_note_filter();
        assert_eq!(app.filter_label(), "Work");
        assert_eq!(app.visible_notes().len(), 1);
        assert_eq!(app.selected_note().unwrap().title, "Standup");
        app.cycle_note_filter();
        assert_eq!(app.filter_label(), "All");
    }

    #[test]
    fn clipboard_text_includes_content_when_present() {
        let mut note = StickyNote::new("Title".to_string());
        assert_eq!(note_clipboard_text(&note), "Title");
        note.content = "Body".to_string();
        assert_eq!(note_clipboard_text(&note), "Title\n\nBody");
    }

    #[test]
    fn decisions_land_in_the_selected_quadrant() {
        let mut app = empty_app();
        app.current_tab = Tab::Decisions;
        app.decisions_right();
        assert_eq!(app.selected_quadrant(), Quadrant::Schedule);
        app.start_new_decision();
        type_text(&mut app, "Learn Rust");
        app.submit_input().unwrap();

        let entry = app.selected_decision().unwrap();
        assert_eq!(entry.title, "Learn Rust");
        assert!(entry.important && !entry.urgent);

        app.decisions_down();
        assert_eq!(app.selected_quadrant(), Quadrant::Eliminate);
        app.decisions_up();
        assert_eq!(app.selected_quadrant(), Quadrant::Schedule);
    }

    #[test]
    fn chats_are_written_in_both_voices() {
        let mut app = empty_app();
        app.current_tab = Tab::AlterEgos;
        app.start_new_alter_ego();
        type_text(&mut app, "Bold Me");
        app.submit_input().unwrap();

        app.start_chat_message(Sender::Me);
        type_text(&mut app, "Should I ask for the raise?");
        app.submit_input().unwrap();
        app.start_chat_message(Sender::AlterEgo);
        type_text(&mut app, "Yes. Tomorrow.");
        app.submit_input().unwrap();

        assert_eq!(app.alter_egos.chats.len(), 1);
        let chat = app.current_chat().unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].sender, Sender::AlterEgo);

        app.request_delete_alter_ego();
        app.confirm_selected().unwrap();
        assert!(app.alter_egos.egos.is_empty());
        assert!(app.alter_egos.chats.is_empty());
        assert!(app.board.store().get_chats().unwrap().is_empty());
    }

    #[test]
    fn writing_without_an_alter_ego_is_refused() {
        let mut app = empty_app();
        app.start_chat_message(Sender::Me);
        assert_eq!(app.mode, Mode::View);
        assert!(app.status.message.is_some());
    }

    #[test]
    fn tick_pushes_debounced_moves() {
        let remote = MemoryRemote::new();
        let store = Persistence::new(
            LocalStore::in_memory().unwrap(),
            Some(Box::new(remote.clone())),
            "u1",
        )
        .with_seeding(false);
        let mut app = app_with(store);
        let id = add_task(&mut app, "Sync me");

        let start = Instant::now();
        app.pick_up();
        app.board_right();
        app.drop_task(start);
        assert_eq!(app.sync_label(), "1 pending");

        let today = app.board.today();
        app.tick_at(start + std::time::Duration::from_secs(1), today);
        assert_eq!(app.board.pending_sync(), 0);
        assert_eq!(app.last_sync, Some(SyncState::Remote));
        let row = remote
            .rows("tasks")
            .into_iter()
            .find(|r| r["id"] == id.as_str())
            .unwrap();
        assert_eq!(row["start_date"], today.checked_add_days(Days::new(1)).unwrap().to_string());
    }

    #[test]
    fn tick_follows_the_calendar() {
        let mut app = empty_app();
        let tomorrow = app.board.today().checked_add_days(Days::new(1)).unwrap();
        app.tick_at(Instant::now(), tomorrow);
        assert_eq!(app.board.today(), tomorrow);
    }

    #[test]
    fn local_only_label() {
        let app = empty_app();
        assert_eq!(app.sync_label(), "local only");
    }

    #[test]
    fn invalid_key_binding_is_reported() {
        let mut bindings = KeyBindings::default();
        bindings.quit = "Ctrl+Nope".to_string();
        let err = Keymap::from_config(&bindings).unwrap_err();
        assert!(matches!(err, TuiError::KeyBindingError(msg) if msg.starts_with("quit")));
    }

    #[test]
    fn tabs_wrap_around() {
        assert_eq!(Tab::AlterEgos.next(), Tab::Board);
        assert_eq!(Tab::Board.prev(), Tab::AlterEgos);
    }
}
