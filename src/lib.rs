pub mod board;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod planner;
pub mod store;
pub mod sync;
pub mod tui;
pub mod utils;

pub use board::{bucket_tasks, move_task, BoardError, DayBucket, MoveRequest, Section};
pub use config::Config;
pub use models::{AlterEgo, Category, Chat, DecisionEntry, NoteCategory, StickyNote, Subtask, Task};
pub use planner::TaskBoard;
pub use store::{Persistence, Saved, StoreError, SyncState};
pub use utils::Profile;
