//! Task lifecycle: validation, authorization, persistence and the
//! notification side effects of each operation.

pub mod controller;
pub mod transition;

pub use controller::TaskController;
pub use transition::plan_status_notifications;

use taskify_proto::task::MAX_TASK_TITLE_LENGTH;

use crate::auth::AuthError;
use crate::store::StoreError;

/// Errors returned by [`TaskController`] operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task title cannot be empty")]
    TitleEmpty,

    #[error("task title too long ({len} chars, max {max})")]
    TitleTooLong { len: usize, max: usize },

    #[error("task {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Forbidden(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Checks a title for create and update.
///
/// # Errors
///
/// Returns [`TaskError::TitleEmpty`] for a blank title or
/// [`TaskError::TitleTooLong`] past [`MAX_TASK_TITLE_LENGTH`] characters.
pub fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    let len = title.chars().count();
    if len > MAX_TASK_TITLE_LENGTH {
        return Err(TaskError::TitleTooLong {
            len,
            max: MAX_TASK_TITLE_LENGTH,
        });
    }
    Ok(())
}
