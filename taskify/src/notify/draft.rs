//! Notification contents for each task event.

use taskify_proto::notification::{NotificationMetadata, NotificationType};
use taskify_proto::task::{TaskId, TaskStatus};
use taskify_proto::user::UserId;

/// A notification ready to be written, minus the store-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub metadata: NotificationMetadata,
}

impl NotificationDraft {
    /// "You were assigned a task."
    #[must_use]
    pub fn assignment(user_id: UserId, task_title: &str, assigned_by: &str, task_id: TaskId) -> Self {
        Self {
            user_id,
            title: "🎯 New Task Assigned".to_string(),
            message: format!("{assigned_by} assigned you a task: \"{task_title}\""),
            kind: NotificationType::TaskAssigned,
            metadata: NotificationMetadata {
                task_title: Some(task_title.to_string()),
                assigned_by: Some(assigned_by.to_string()),
                task_id: Some(task_id),
                ..NotificationMetadata::default()
            },
        }
    }

    /// "A task you hold changed status."
    #[must_use]
    pub fn status_update(
        user_id: UserId,
        task_title: &str,
        updated_by: &str,
        new_status: TaskStatus,
        task_id: TaskId,
    ) -> Self {
        Self {
            user_id,
            title: "📝 Task Updated".to_string(),
            message: format!("{updated_by} updated \"{task_title}\" to {new_status}"),
            kind: NotificationType::TaskUpdated,
            metadata: NotificationMetadata {
                task_title: Some(task_title.to_string()),
                status: Some(new_status.as_str().to_string()),
                task_id: Some(task_id),
                ..NotificationMetadata::default()
            },
        }
    }

    /// "A task you created was completed."
    #[must_use]
    pub fn completion(
        user_id: UserId,
        task_title: &str,
        completed_by: &str,
        task_id: TaskId,
    ) -> Self {
        Self {
            user_id,
            title: "✅ Task Completed".to_string(),
            message: format!("{completed_by} completed the task: \"{task_title}\""),
            kind: NotificationType::TaskCompleted,
            metadata: NotificationMetadata {
                task_title: Some(task_title.to_string()),
                task_id: Some(task_id),
                ..NotificationMetadata::default()
            },
        }
    }
}
