//! In-memory document store.
//!
//! Holds both collections behind `parking_lot` locks that are never held
//! across an `.await`. Every successful write fires the collection's
//! broadcast change signal. Records are lost on restart.

use std::collections::HashMap;

use parking_lot::RwLock;
use taskify_proto::notification::{Notification, NotificationId};
use taskify_proto::task::{Task, TaskFilter, TaskId, TaskPatch};
use taskify_proto::user::UserId;
use tokio::sync::broadcast;

use super::{
    NOTIFICATIONS, NotificationFields, NotificationRepository, StoreError, TASKS, TaskFields,
    TaskRepository,
};

/// Default capacity of each change-signal channel.
const DEFAULT_CHANGE_CAPACITY: usize = 256;

/// A record plus its insertion sequence number, used as an ordering tiebreak.
#[derive(Debug)]
struct Entry<T> {
    seq: u64,
    record: T,
}

#[derive(Debug)]
struct Collection<K, T> {
    next_seq: u64,
    records: HashMap<K, Entry<T>>,
}

impl<K: std::hash::Hash + Eq, T> Collection<K, T> {
    fn insert(&mut self, key: K, record: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(key, Entry { seq, record });
    }
}

/// Both collections in process memory.
pub struct MemoryStore {
    tasks: RwLock<Collection<TaskId, Task>>,
    notifications: RwLock<Collection<NotificationId, Notification>>,
    task_changes: broadcast::Sender<()>,
    notification_changes: broadcast::Sender<()>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the default change-signal capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_change_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Creates an empty store whose change signals buffer `capacity` events
    /// per subscriber before lagging.
    #[must_use]
    pub fn with_change_capacity(capacity: usize) -> Self {
        let (task_changes, _) = broadcast::channel(capacity.max(1));
        let (notification_changes, _) = broadcast::channel(capacity.max(1));
        Self {
            tasks: RwLock::new(Collection {
                next_seq: 0,
                records: HashMap::new(),
            }),
            notifications: RwLock::new(Collection {
                next_seq: 0,
                records: HashMap::new(),
            }),
            task_changes,
            notification_changes,
        }
    }

    /// Number of stored tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.read().records.len()
    }

    /// Number of stored notifications across all users.
    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.read().records.len()
    }

    fn signal_tasks(&self) {
        // No receivers is fine: nobody is watching.
        let _ = self.task_changes.send(());
    }

    fn signal_notifications(&self) {
        let _ = self.notification_changes.send(());
    }
}

impl TaskRepository for MemoryStore {
    async fn insert(&self, fields: TaskFields) -> Result<TaskId, StoreError> {
        let id = TaskId::new();
        self.tasks.write().insert(id.clone(), fields.into_task(id.clone()));
        tracing::debug!(task_id = %id, "task inserted");
        self.signal_tasks();
        Ok(id)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().records.get(id).map(|e| e.record.clone()))
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        {
            let mut tasks = self.tasks.write();
            let entry = tasks.records.get_mut(id).ok_or_else(|| StoreError::NotFound {
                collection: TASKS,
                id: id.to_string(),
            })?;
            entry.record.apply(patch);
        }
        tracing::debug!(task_id = %id, "task updated");
        self.signal_tasks();
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<bool, StoreError> {
        let existed = self.tasks.write().records.remove(id).is_some();
        if existed {
            tracing::debug!(task_id = %id, "task deleted");
            self.signal_tasks();
        }
        Ok(existed)
    }

    async fn query(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read();
        let mut matching: Vec<&Entry<Task>> = tasks
            .records
            .values()
            .filter(|e| filter.matches(&e.record))
            .collect();
        matching.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(matching.into_iter().map(|e| e.record.clone()).collect())
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.task_changes.subscribe()
    }
}

impl NotificationRepository for MemoryStore {
    async fn insert(&self, fields: NotificationFields) -> Result<NotificationId, StoreError> {
        let id = NotificationId::new();
        self.notifications
            .write()
            .insert(id.clone(), fields.into_notification(id.clone()));
        tracing::debug!(notification_id = %id, "notification inserted");
        self.signal_notifications();
        Ok(id)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), StoreError> {
        {
            let mut notifications = self.notifications.write();
            let entry =
                notifications
                    .records
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: NOTIFICATIONS,
                        id: id.to_string(),
                    })?;
            entry.record.read = true;
        }
        self.signal_notifications();
        Ok(())
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read();
        let mut matching: Vec<&Entry<Notification>> = notifications
            .records
            .values()
            .filter(|e| e.record.user_id == *user_id)
            .collect();
        // Latest insert first, matching the task query's tiebreak.
        matching.sort_by_key(|e| std::cmp::Reverse(e.seq));
        Ok(matching.into_iter().map(|e| e.record.clone()).collect())
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.notification_changes.subscribe()
    }
}
