//! Notification dispatcher.
//!
//! Creates per-user notification records for task events and serves live,
//! newest-first views of a user's notifications. The dispatcher owns no
//! state beyond its repository handle, so it is cheap to clone into
//! request handlers and feed tasks.

pub mod draft;

pub use draft::NotificationDraft;

use std::sync::Arc;

use taskify_proto::notification::{
    Notification, NotificationId, NotificationMetadata, NotificationType, sort_newest_first,
    unread_count,
};
use taskify_proto::task::TaskId;
use taskify_proto::time::Timestamp;
use taskify_proto::user::UserId;

use crate::store::{
    NotificationFields, NotificationRepository, StoreError, Subscription, spawn_live_query,
};

/// Errors raised while writing or updating notifications.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Some of the updates in a bulk mark-read failed. The ones that
    /// succeeded stay applied.
    #[error("{failed} of {attempted} notifications could not be marked read")]
    MarkAllRead { failed: usize, attempted: usize },
}

/// A user's notifications in display order plus the unread count.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

/// Writes and reads notification records.
pub struct NotificationDispatcher<N> {
    store: Arc<N>,
}

impl<N> Clone for NotificationDispatcher<N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<N: NotificationRepository> NotificationDispatcher<N> {
    /// Creates a dispatcher over `store`.
    pub const fn new(store: Arc<N>) -> Self {
        Self { store }
    }

    /// Writes one unread notification stamped with the current time.
    ///
    /// The top-level `taskId` back-reference is copied from
    /// `metadata.task_id`. Calling twice creates two records.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the write fails.
    pub async fn notify(
        &self,
        user_id: UserId,
        title: String,
        message: String,
        kind: NotificationType,
        metadata: NotificationMetadata,
    ) -> Result<NotificationId, DispatchError> {
        let fields = NotificationFields {
            user_id,
            title,
            message,
            kind,
            task_id: metadata.task_id.clone(),
            read: false,
            created_at: Timestamp::now(),
            metadata,
        };
        let user = fields.user_id.clone();
        let id = self.store.insert(fields).await?;
        tracing::info!(notification_id = %id, user_id = %user, %kind, "notification created");
        Ok(id)
    }

    /// Writes a prepared draft.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the write fails.
    pub async fn dispatch(&self, draft: NotificationDraft) -> Result<NotificationId, DispatchError> {
        self.notify(
            draft.user_id,
            draft.title,
            draft.message,
            draft.kind,
            draft.metadata,
        )
        .await
    }

    /// Tells `user_id` they were assigned a task.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the write fails.
    pub async fn notify_task_assignment(
        &self,
        user_id: UserId,
        task_title: &str,
        assigned_by: &str,
        task_id: TaskId,
    ) -> Result<NotificationId, DispatchError> {
        self.dispatch(NotificationDraft::assignment(
            user_id,
            task_title,
            assigned_by,
            task_id,
        ))
        .await
    }

    /// One-shot read of a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the read fails.
    pub async fn snapshot(&self, user_id: &UserId) -> Result<Inbox, DispatchError> {
        let mut notifications = self.store.for_user(user_id).await?;
        sort_newest_first(&mut notifications);
        let unread = unread_count(&notifications);
        Ok(Inbox {
            notifications,
            unread,
        })
    }

    /// Streams a user's notifications to `callback`.
    ///
    /// The callback receives the full set, newest first, once immediately
    /// and again whenever the set changes. Drop the returned handle to stop.
    pub fn subscribe<C>(&self, user_id: UserId, callback: C) -> Subscription
    where
        C: FnMut(Vec<Notification>) + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let label = format!("notifications:{user_id}");
        spawn_live_query(
            label,
            store.changes(),
            move || {
                let store = Arc::clone(&store);
                let user_id = user_id.clone();
                async move {
                    let mut list = store.for_user(&user_id).await?;
                    sort_newest_first(&mut list);
                    Ok(list)
                }
            },
            callback,
        )
    }

    /// Marks one notification read.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the notification does not exist
    /// or the write fails.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<(), DispatchError> {
        self.store.mark_read(id).await?;
        tracing::debug!(notification_id = %id, "notification marked read");
        Ok(())
    }

    /// Marks every id in `ids` read, issuing the updates concurrently.
    ///
    /// Updates that succeed are kept even when others fail. An empty slice
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MarkAllRead`] if any update failed.
    pub async fn mark_all_read(
        &self,
        user_id: &UserId,
        ids: &[NotificationId],
    ) -> Result<(), DispatchError> {
        if ids.is_empty() {
            return Ok(());
        }

        let results =
            futures_util::future::join_all(ids.iter().map(|id| self.store.mark_read(id))).await;

        let mut failed = 0;
        for (id, result) in ids.iter().zip(&results) {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(notification_id = %id, error = %e, "mark read failed");
            }
        }

        tracing::info!(
            user_id = %user_id,
            attempted = ids.len(),
            failed,
            "bulk mark read finished"
        );

        if failed > 0 {
            return Err(DispatchError::MarkAllRead {
                failed,
                attempted: ids.len(),
            });
        }
        Ok(())
    }
}
