//! Which notifications a status change produces.

use taskify_proto::task::{Task, TaskStatus};
use taskify_proto::user::Actor;

use crate::notify::NotificationDraft;

/// Plans the notifications for moving `task` (the caller's snapshot) to
/// `new_status`.
///
/// - Same status: nothing.
/// - Otherwise the assignee hears about the update.
/// - Reaching `completed` on a task someone else created also tells the
///   creator, credited to the assignee (or the actor on an unassigned task).
///
/// Empty user ids never receive notifications.
#[must_use]
pub fn plan_status_notifications(
    task: &Task,
    new_status: TaskStatus,
    actor: &Actor,
) -> Vec<NotificationDraft> {
    if task.status == new_status {
        return Vec::new();
    }

    let mut drafts = Vec::with_capacity(2);
    if !task.assigned_to.is_empty() {
        drafts.push(NotificationDraft::status_update(
            task.assigned_to.clone(),
            &task.title,
            &actor.name,
            new_status,
            task.id.clone(),
        ));
    }

    if new_status == TaskStatus::Completed
        && !task.created_by.is_empty()
        && task.created_by != task.assigned_to
    {
        let completed_by = if task.assigned_to_name.trim().is_empty() {
            &actor.name
        } else {
            &task.assigned_to_name
        };
        drafts.push(NotificationDraft::completion(
            task.created_by.clone(),
            &task.title,
            completed_by,
            task.id.clone(),
        ));
    }

    drafts
}
