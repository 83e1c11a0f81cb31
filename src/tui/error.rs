use thiserror::Error;

use crate::planner::PlannerError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("IO/Terminal error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Key binding error: {0}")]
    KeyBindingError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}
