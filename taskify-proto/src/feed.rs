//! Frames pushed over the live WebSocket feeds.
//!
//! Every frame carries the full current result set of the subscribed query,
//! never a delta; clients replace their view wholesale.

use serde::{Deserialize, Serialize};

use crate::notification::{Notification, unread_count};
use crate::task::{Task, TaskStats};

/// One frame on a live feed, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedEvent {
    /// A user's notifications, newest first.
    Notifications {
        notifications: Vec<Notification>,
        unread: usize,
    },
    /// A filtered task list, newest first, with dashboard counters.
    Tasks { tasks: Vec<Task>, stats: TaskStats },
    /// The server could not serve the feed.
    Error { reason: String },
}

impl FeedEvent {
    /// Builds a notifications frame, counting unread entries.
    #[must_use]
    pub fn notifications(notifications: Vec<Notification>) -> Self {
        let unread = unread_count(&notifications);
        Self::Notifications {
            notifications,
            unread,
        }
    }

    /// Builds a tasks frame, computing stats over the same set.
    #[must_use]
    pub fn tasks(tasks: Vec<Task>) -> Self {
        let stats = TaskStats::from_tasks(&tasks);
        Self::Tasks { tasks, stats }
    }
}
