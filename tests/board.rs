use std::time::{Duration, Instant};

use chrono::Days;
use dayboard::config::BoardConfig;
use dayboard::planner::{ActionOutcome, BoardAction, PlannerError};
use dayboard::store::{LocalStore, MemoryRemote, Record};
use dayboard::{BoardError, Category, MoveRequest, Persistence, Section, SyncState, Task, TaskBoard};
use tempfile::TempDir;

fn board_with_remote(dir: &TempDir, remote: &MemoryRemote, config: &BoardConfig) -> TaskBoard {
    let local = LocalStore::open(&dir.path().join("dayboard.db")).unwrap();
    let store = Persistence::new(local, Some(Box::new(remote.clone())), "u1").with_seeding(false);
    let mut board = TaskBoard::new(store, config);
    board.load().unwrap();
    board
}

fn remote_task(remote: &MemoryRemote, id: &str) -> Option<serde_json::Value> {
    remote
        .rows(Task::TABLE)
        .into_iter()
        .find(|row| row["id"] == id)
}

fn move_to(board: &TaskBoard, id: &str, to_day: usize, to_category: Category) -> MoveRequest {
    let from_day = board
        .buckets()
        .iter()
        .position(|b| b.find(id).is_some())
        .unwrap();
    let from_category = board.task(id).unwrap().category;
    MoveRequest {
        task_id: id.to_string(),
        from_day,
        to_day,
        from_category,
        to_category,
        source_index: None,
        target_index: 0,
    }
}

#[test]
fn board_always_shows_the_configured_number_of_days() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let buckets = board.buckets();
    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[0].date, board.today());
    for pair in buckets.windows(2) {
        assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
    }
    assert!(buckets.iter().all(|b| !b.is_past));
}

#[test]
fn moves_are_pushed_once_after_the_quiet_period() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let id = board
        .add_task("Book flights", Category::Personal, None)
        .unwrap()
        .record
        .id;
    let start = Instant::now();

    let saved = board
        .move_task(&move_to(&board, &id, 2, Category::Personal), start)
        .unwrap();
    assert_eq!(saved.sync, SyncState::Pending);
    let saved = board
        .move_task(&move_to(&board, &id, 3, Category::Work), start + Duration::from_millis(50))
        .unwrap();
    assert_eq!(saved.sync, SyncState::Pending);
    assert_eq!(board.pending_sync(), 1);

    // Still inside the window of the second move
    let early = board.flush_due(start + Duration::from_millis(100));
    assert_eq!(early.pushed, 0);
    let row = remote_task(&remote, &id).unwrap();
    assert_eq!(row["category"], "personal");

    let report = board.flush_due(start + Duration::from_millis(400));
    assert_eq!(report.pushed, 1);
    assert_eq!(board.pending_sync(), 0);

    let day3 = board.today().checked_add_days(Days::new(3)).unwrap();
    let row = remote_task(&remote, &id).unwrap();
    assert_eq!(row["category"], "work");
    assert_eq!(row["start_date"], day3.format("%Y-%m-%d").to_string());
}

#[test]
fn moved_tasks_land_at_the_requested_index() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let first = board.add_task("First", Category::Work, Some(1)).unwrap().record.id;
    let second = board.add_task("Second", Category::Work, Some(1)).unwrap().record.id;
    let mover = board.add_task("Mover", Category::Work, None).unwrap().record.id;

    let mut req = move_to(&board, &mover, 1, Category::Work);
    req.target_index = 1;
    board.move_task(&req, Instant::now()).unwrap();

    let ids: Vec<&str> = board.buckets()[1]
        .section(Section::Todo)
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ids, vec![first.as_str(), mover.as_str(), second.as_str()]);
    let positions: Vec<i64> = ["First", "Mover", "Second"]
        .iter()
        .map(|text| board.tasks().iter().find(|t| t.text == *text).unwrap().position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn open_tasks_cannot_move_into_the_past() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let config = BoardConfig {
        days_back: 1,
        ..BoardConfig::default()
    };
    let mut board = board_with_remote(&dir, &remote, &config);
    assert_eq!(board.buckets().len(), 8);
    assert!(board.buckets()[0].is_past);

    let id = board.add_task("Stay put", Category::Work, None).unwrap().record.id;
    let err = board
        .move_task(&move_to(&board, &id, 0, Category::Work), Instant::now())
        .unwrap_err();
    assert!(matches!(err, PlannerError::Board(BoardError::PastDay(_))));
    assert_eq!(board.task(&id).unwrap().start_date, Some(board.today()));
    assert_eq!(board.pending_sync(), 0);
}

#[test]
fn completing_a_task_moves_it_to_the_completed_section() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let id = board.add_task("Water plants", Category::Personal, None).unwrap().record.id;
    let outcome = board.handle(
        BoardAction::ToggleCompletion { task_id: id.clone() },
        Instant::now(),
    );
    assert!(matches!(outcome, ActionOutcome::Saved(ref s) if s.sync == SyncState::Remote));

    let today = &board.buckets()[0];
    assert_eq!(today.find(&id).map(|(section, _)| section), Some(Section::Completed));
    let row = remote_task(&remote, &id).unwrap();
    assert_eq!(row["completed"], true);
    assert_eq!(row["completion_date"], board.today().format("%Y-%m-%d").to_string());
}

#[test]
fn finishing_every_subtask_completes_the_parent() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let id = board.add_task("Pack", Category::Personal, None).unwrap().record.id;
    board.add_subtask(&id, "Clothes").unwrap();
    let task = board.add_subtask(&id, "Charger").unwrap().record;
    let subtask_ids: Vec<String> = task.subtasks.iter().map(|s| s.id.clone()).collect();

    board.toggle_subtask(&id, &subtask_ids[0]).unwrap();
    assert!(!board.task(&id).unwrap().completed);
    board.toggle_subtask(&id, &subtask_ids[1]).unwrap();
    assert!(board.task(&id).unwrap().completed);

    board.toggle_subtask(&id, &subtask_ids[1]).unwrap();
    assert!(!board.task(&id).unwrap().completed);
}

#[test]
fn rejected_actions_leave_the_board_untouched() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());

    let outcome = board.handle(
        BoardAction::AddTask {
            text: "   ".to_string(),
            category: Category::Work,
            day: 0,
        },
        Instant::now(),
    );
    assert!(matches!(outcome, ActionOutcome::Rejected(_)));
    assert!(board.tasks().is_empty());
}

#[test]
fn the_board_reloads_what_another_session_saved() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut first = board_with_remote(&dir, &remote, &BoardConfig::default());
    let id = first.add_task("Shared", Category::Work, Some(4)).unwrap().record.id;

    let other_dir = TempDir::new().unwrap();
    let second = board_with_remote(&other_dir, &remote, &BoardConfig::default());
    let (section, _) = second.buckets()[4].find(&id).unwrap();
    assert_eq!(section, Section::Todo);
}

#[test]
fn offline_moves_survive_reconnecting() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());
    let id = board
        .add_task("Renew passport", Category::Personal, None)
        .unwrap()
        .record
        .id;

    remote.set_offline(true);
    board
        .move_task(&move_to(&board, &id, 3, Category::Work), Instant::now())
        .unwrap();
    let report = board.flush_all();
    assert_eq!(report.failed, 1);

    remote.set_offline(false);
    board.load().unwrap();

    let day3 = board.today().checked_add_days(Days::new(3)).unwrap();
    let task = board.task(&id).unwrap();
    assert_eq!(task.category, Category::Work);
    assert_eq!(task.start_date, Some(day3));
    let row = remote_task(&remote, &id).unwrap();
    assert_eq!(row["category"], "work");
    assert_eq!(row["start_date"], day3.format("%Y-%m-%d").to_string());
}

#[test]
fn failed_deletes_keep_the_task_on_the_board() {
    let dir = TempDir::new().unwrap();
    let remote = MemoryRemote::new();
    let mut board = board_with_remote(&dir, &remote, &BoardConfig::default());
    let id = board
        .add_task("Water plants", Category::Personal, None)
        .unwrap()
        .record
        .id;

    let db = rusqlite::Connection::open(dir.path().join("dayboard.db")).unwrap();
    db.execute("DROP TABLE kv_store", []).unwrap();

    assert!(board.delete_task(&id).is_err());
    assert!(board.task(&id).is_some());
}
