//! Task lifecycle controller.
//!
//! Every operation validates, authorizes, then writes through the task
//! repository. Notifications and emails are side effects: their failures
//! are logged and never fail the operation that triggered them.

use std::sync::Arc;

use taskify_proto::mail::SendEmailRequest;
use taskify_proto::task::{NewTask, Task, TaskFilter, TaskId, TaskPatch, TaskStats, TaskStatus};
use taskify_proto::time::Timestamp;
use taskify_proto::user::Actor;

use super::transition::plan_status_notifications;
use super::{TaskError, validate_title};
use crate::auth::{AccessPolicy, Authorizer, TaskAction};
use crate::mail::{EmailSender, SendOutcome};
use crate::notify::NotificationDispatcher;
use crate::store::{
    NotificationRepository, StoreError, Subscription, TaskFields, TaskRepository,
    spawn_live_query,
};

/// Application-layer entry point for task operations.
pub struct TaskController<T, N, M, A = AccessPolicy> {
    tasks: Arc<T>,
    notifier: NotificationDispatcher<N>,
    mailer: Arc<M>,
    authorizer: A,
}

impl<T, N, M, A: Clone> Clone for TaskController<T, N, M, A> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            notifier: self.notifier.clone(),
            mailer: Arc::clone(&self.mailer),
            authorizer: self.authorizer.clone(),
        }
    }
}

fn not_found_or(err: StoreError) -> TaskError {
    match err {
        StoreError::NotFound { id, .. } => TaskError::NotFound(id),
        other => TaskError::Store(other),
    }
}

impl<T, N, M, A> TaskController<T, N, M, A>
where
    T: TaskRepository,
    N: NotificationRepository,
    M: EmailSender,
    A: Authorizer,
{
    pub const fn new(
        tasks: Arc<T>,
        notifier: NotificationDispatcher<N>,
        mailer: Arc<M>,
        authorizer: A,
    ) -> Self {
        Self {
            tasks,
            notifier,
            mailer,
            authorizer,
        }
    }

    /// The dispatcher this controller notifies through.
    pub const fn notifier(&self) -> &NotificationDispatcher<N> {
        &self.notifier
    }

    /// Creates a task owned by `actor`.
    ///
    /// The assignee (if any) gets a `task_assigned` notification, and an
    /// assignment email when `new_task` carries their address. The email is
    /// sent in the background.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`TaskError::Forbidden`], or
    /// [`TaskError::Store`] if the write fails. Nothing is written on error.
    pub async fn create(&self, new_task: NewTask, actor: &Actor) -> Result<Task, TaskError> {
        validate_title(&new_task.title)?;
        self.authorizer.authorize(actor, TaskAction::Create)?;

        let NewTask {
            title,
            description,
            status,
            assigned_to,
            assigned_to_name,
            assigned_to_email,
        } = new_task;

        let fields = TaskFields {
            title,
            description,
            status,
            assigned_to,
            assigned_to_name,
            created_by: actor.uid.clone(),
            created_by_name: actor.name.clone(),
            created_at: Timestamp::now(),
        };
        let id = self.tasks.insert(fields.clone()).await?;
        let task = fields.into_task(id);
        tracing::info!(task_id = %task.id, created_by = %actor.uid, "task created");

        if task.assigned_to.is_empty() {
            return Ok(task);
        }

        if let Err(e) = self
            .notifier
            .notify_task_assignment(
                task.assigned_to.clone(),
                &task.title,
                &actor.name,
                task.id.clone(),
            )
            .await
        {
            tracing::warn!(task_id = %task.id, error = %e, "assignment notification failed");
        }

        if let Some(to) = assigned_to_email.filter(|addr| !addr.trim().is_empty()) {
            self.spawn_assignment_email(SendEmailRequest {
                to,
                to_name: task.assigned_to_name.clone(),
                task_title: task.title.clone(),
                task_description: task.description.clone(),
                assigned_by: actor.name.clone(),
            });
        }

        Ok(task)
    }

    fn spawn_assignment_email(&self, request: SendEmailRequest) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            match mailer.send_task_email(&request).await {
                Ok(SendOutcome::Sent { message_id }) => {
                    tracing::info!(to = %request.to, %message_id, "assignment email sent");
                }
                Ok(SendOutcome::Simulated) => {
                    tracing::info!(to = %request.to, "assignment email simulated");
                }
                Err(e) => {
                    tracing::warn!(to = %request.to, error = %e, "assignment email failed");
                }
            }
        });
    }

    /// Applies a partial update. Produces no notifications.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id, a validation
    /// error for a bad title, [`TaskError::Forbidden`] or
    /// [`TaskError::Store`].
    pub async fn update(&self, id: &TaskId, patch: TaskPatch, actor: &Actor) -> Result<(), TaskError> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        self.authorizer.authorize(actor, TaskAction::Update)?;

        if patch.is_empty() {
            return match self.tasks.get(id).await? {
                Some(_) => Ok(()),
                None => Err(TaskError::NotFound(id.to_string())),
            };
        }

        self.tasks.update(id, &patch).await.map_err(not_found_or)?;
        tracing::info!(task_id = %id, updated_by = %actor.uid, "task updated");
        Ok(())
    }

    /// Moves a task to `new_status` and notifies according to
    /// [`plan_status_notifications`], comparing against the caller's
    /// `snapshot` rather than re-reading the record.
    ///
    /// Returns how many notifications were written.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if the task no longer exists,
    /// [`TaskError::Forbidden`] or [`TaskError::Store`].
    pub async fn update_status(
        &self,
        snapshot: &Task,
        new_status: TaskStatus,
        actor: &Actor,
    ) -> Result<usize, TaskError> {
        self.authorizer.authorize(actor, TaskAction::UpdateStatus)?;
        self.tasks
            .update(&snapshot.id, &TaskPatch::status(new_status))
            .await
            .map_err(not_found_or)?;
        tracing::info!(
            task_id = %snapshot.id,
            from = %snapshot.status,
            to = %new_status,
            "task status changed"
        );

        let mut notified = 0;
        for draft in plan_status_notifications(snapshot, new_status, actor) {
            let kind = draft.kind;
            match self.notifier.dispatch(draft).await {
                Ok(_) => notified += 1,
                Err(e) => {
                    tracing::warn!(task_id = %snapshot.id, %kind, error = %e, "status notification failed");
                }
            }
        }
        Ok(notified)
    }

    /// Reads the task and calls [`Self::update_status`], using
    /// `previous_status` in place of the stored status when given.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_status`].
    pub async fn set_status(
        &self,
        id: &TaskId,
        new_status: TaskStatus,
        previous_status: Option<TaskStatus>,
        actor: &Actor,
    ) -> Result<usize, TaskError> {
        let mut snapshot = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        if let Some(previous) = previous_status {
            snapshot.status = previous;
        }
        self.update_status(&snapshot, new_status, actor).await
    }

    /// Permanently deletes a task. Returns whether it existed.
    /// Notifications referring to it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Forbidden`] or [`TaskError::Store`].
    pub async fn delete(&self, id: &TaskId, actor: &Actor) -> Result<bool, TaskError> {
        self.authorizer.authorize(actor, TaskAction::Delete)?;
        let existed = self.tasks.delete(id).await?;
        if existed {
            tracing::info!(task_id = %id, deleted_by = %actor.uid, "task deleted");
        }
        Ok(existed)
    }

    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the read fails.
    pub async fn get(&self, id: &TaskId) -> Result<Option<Task>, TaskError> {
        Ok(self.tasks.get(id).await?)
    }

    /// Lists matching tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the read fails.
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError> {
        Ok(self.tasks.query(filter).await?)
    }

    /// Per-status counts over the matching tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the read fails.
    pub async fn stats(&self, filter: &TaskFilter) -> Result<TaskStats, TaskError> {
        Ok(TaskStats::from_tasks(&self.list(filter).await?))
    }

    /// Streams the matching tasks to `callback`, once immediately and again
    /// whenever the result changes.
    pub fn subscribe<C>(&self, filter: TaskFilter, callback: C) -> Subscription
    where
        C: FnMut(Vec<Task>) + Send + 'static,
    {
        let tasks = Arc::clone(&self.tasks);
        let label = format!("tasks:{filter:?}");
        spawn_live_query(
            label,
            tasks.changes(),
            move || {
                let tasks = Arc::clone(&tasks);
                let filter = filter.clone();
                async move { tasks.query(&filter).await }
            },
            callback,
        )
    }
}
