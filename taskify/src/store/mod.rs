//! Document store interfaces.
//!
//! One repository trait per entity. Implementations assign ids, apply
//! single-record writes atomically, and publish a change signal after every
//! successful write so live queries can re-run. There are no transactions
//! spanning records: a task write and the notification it triggers are two
//! independent writes.
//!
//! Concrete implementations:
//! - [`memory::MemoryStore`]: in-process maps, backs the server and tests

pub mod live;
pub mod memory;

pub use live::{Subscription, spawn_live_query};
pub use memory::MemoryStore;

use taskify_proto::notification::{
    Notification, NotificationId, NotificationMetadata, NotificationType,
};
use taskify_proto::task::{Task, TaskFilter, TaskId, TaskPatch, TaskStatus};
use taskify_proto::time::Timestamp;
use taskify_proto::user::UserId;
use tokio::sync::broadcast;

/// Collection name for tasks, used in errors and logs.
pub const TASKS: &str = "tasks";
/// Collection name for notifications.
pub const NOTIFICATIONS: &str = "notifications";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{collection}/{id} not found")]
    NotFound {
        /// Collection that was addressed.
        collection: &'static str,
        /// Record id.
        id: String,
    },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Every task attribute except the store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: UserId,
    pub assigned_to_name: String,
    pub created_by: UserId,
    pub created_by_name: String,
    pub created_at: Timestamp,
}

impl TaskFields {
    /// Attaches the id the store chose.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            assigned_to: self.assigned_to,
            assigned_to_name: self.assigned_to_name,
            created_by: self.created_by,
            created_by_name: self.created_by_name,
            created_at: self.created_at,
        }
    }
}

/// Every notification attribute except the store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFields {
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub task_id: Option<TaskId>,
    pub read: bool,
    pub created_at: Timestamp,
    pub metadata: NotificationMetadata,
}

impl NotificationFields {
    /// Attaches the id the store chose.
    #[must_use]
    pub fn into_notification(self, id: NotificationId) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind: self.kind,
            task_id: self.task_id,
            read: self.read,
            created_at: self.created_at,
            metadata: self.metadata,
        }
    }
}

/// Persistence for task records.
pub trait TaskRepository: Send + Sync + 'static {
    /// Writes a new task and returns the id the store assigned.
    fn insert(
        &self,
        fields: TaskFields,
    ) -> impl std::future::Future<Output = Result<TaskId, StoreError>> + Send;

    /// Reads one task.
    fn get(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Option<Task>, StoreError>> + Send;

    /// Applies a partial update. Fails with [`StoreError::NotFound`] if the
    /// task does not exist.
    fn update(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Permanently removes a task. Returns whether it existed.
    fn delete(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Returns matching tasks ordered by `created_at` descending.
    fn query(
        &self,
        filter: &TaskFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Subscribes to the change signal fired after every task write.
    fn changes(&self) -> broadcast::Receiver<()>;
}

/// Persistence for notification records.
pub trait NotificationRepository: Send + Sync + 'static {
    /// Writes a new notification and returns the id the store assigned.
    fn insert(
        &self,
        fields: NotificationFields,
    ) -> impl std::future::Future<Output = Result<NotificationId, StoreError>> + Send;

    /// Sets `read = true`. Fails with [`StoreError::NotFound`] if absent.
    fn mark_read(
        &self,
        id: &NotificationId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Returns every notification addressed to `user_id`, in no particular
    /// order; display ordering is the caller's job.
    fn for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Notification>, StoreError>> + Send;

    /// Subscribes to the change signal fired after every notification write.
    fn changes(&self) -> broadcast::Receiver<()>;
}
