//! Integration tests for the task lifecycle.
//!
//! Drives `TaskController` end to end against the in-memory store and
//! checks the notification side effects of each operation.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use taskify::auth::AccessPolicy;
use taskify::mail::{MailError, MailRelay, MailTransport, OutgoingEmail};
use taskify::notify::NotificationDispatcher;
use taskify::store::{
    MemoryStore, NotificationFields, NotificationRepository, StoreError, TaskRepository,
};
use taskify::tasks::{TaskController, TaskError};
use taskify_proto::notification::{Notification, NotificationId, NotificationType};
use taskify_proto::task::{NewTask, TaskFilter, TaskPatch, TaskStatus};
use taskify_proto::user::{Actor, Role, UserId};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Records every email handed to it.
#[derive(Clone, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl MailTransport for RecordingTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        self.sent.lock().push(email.clone());
        Ok(format!("<{}@test>", self.sent.lock().len()))
    }
}

/// Counts delivery attempts and fails every one.
#[derive(Clone, Default)]
struct RefusingTransport {
    attempts: Arc<Mutex<usize>>,
}

impl MailTransport for RefusingTransport {
    async fn deliver(&self, _email: &OutgoingEmail) -> Result<String, MailError> {
        *self.attempts.lock() += 1;
        Err(MailError::Rejected("mailbox unavailable".to_string()))
    }
}

/// A notification store that refuses every write.
struct BrokenNotifications {
    changes: broadcast::Sender<()>,
}

impl BrokenNotifications {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(4);
        Self { changes }
    }
}

impl NotificationRepository for BrokenNotifications {
    async fn insert(&self, _fields: NotificationFields) -> Result<NotificationId, StoreError> {
        Err(StoreError::Unavailable("notifications offline".to_string()))
    }

    async fn mark_read(&self, _id: &NotificationId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("notifications offline".to_string()))
    }

    async fn for_user(&self, _user_id: &UserId) -> Result<Vec<Notification>, StoreError> {
        Err(StoreError::Unavailable("notifications offline".to_string()))
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

type Controller = TaskController<MemoryStore, MemoryStore, MailRelay<RecordingTransport>>;

fn setup() -> (Controller, Arc<MemoryStore>, RecordingTransport) {
    let store = Arc::new(MemoryStore::new());
    let transport = RecordingTransport::default();
    let ctl = TaskController::new(
        Arc::clone(&store),
        NotificationDispatcher::new(Arc::clone(&store)),
        Arc::new(MailRelay::with_transport(transport.clone())),
        AccessPolicy::Open,
    );
    (ctl, store, transport)
}

fn alice() -> Actor {
    Actor::new("alice-uid", "Alice", Role::Admin)
}

fn bob() -> Actor {
    Actor::new("bob-uid", "Bob", Role::Member)
}

fn report_for_bob() -> NewTask {
    NewTask {
        title: "Write report".to_string(),
        description: "Q3 summary".to_string(),
        status: TaskStatus::Pending,
        assigned_to: UserId::new("bob-uid"),
        assigned_to_name: "Bob".to_string(),
        assigned_to_email: None,
    }
}

async fn inbox(store: &MemoryStore, uid: &str) -> Vec<Notification> {
    store.for_user(&UserId::new(uid)).await.unwrap()
}

// ===========================================================================
// Create
// ===========================================================================

#[tokio::test]
async fn alice_assigns_bob_a_report() {
    let (ctl, store, _) = setup();

    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();

    let stored = store.get(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.created_by, UserId::new("alice-uid"));
    assert_eq!(stored.created_by_name, "Alice");
    assert_eq!(stored.status, TaskStatus::Pending);

    let bobs = inbox(&store, "bob-uid").await;
    assert_eq!(bobs.len(), 1);
    let n = &bobs[0];
    assert_eq!(n.kind, NotificationType::TaskAssigned);
    assert_eq!(n.title, "🎯 New Task Assigned");
    assert!(n.message.contains("Alice"));
    assert!(n.message.contains("Write report"));
    assert!(!n.read);
    assert_eq!(n.task_id.as_ref(), Some(&task.id));
    assert_eq!(n.metadata.assigned_by.as_deref(), Some("Alice"));

    assert!(inbox(&store, "alice-uid").await.is_empty());
}

#[tokio::test]
async fn assignment_email_is_sent_in_background() {
    let (ctl, _, transport) = setup();
    let mut input = report_for_bob();
    input.assigned_to_email = Some("bob@example.com".to_string());

    ctl.create(input, &alice()).await.unwrap();

    let mut sent = Vec::new();
    for _ in 0..200 {
        sent = transport.sent.lock().clone();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.com");
    assert_eq!(sent[0].subject, "🎯 New Task Assigned: Write report");
    assert!(sent[0].html.contains("Alice"));
}

#[tokio::test]
async fn no_email_without_address() {
    let (ctl, _, transport) = setup();
    ctl.create(report_for_bob(), &alice()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent.lock().is_empty());
}

#[tokio::test]
async fn mail_failure_does_not_fail_creation() {
    let store = Arc::new(MemoryStore::new());
    let transport = RefusingTransport::default();
    let ctl = TaskController::new(
        Arc::clone(&store),
        NotificationDispatcher::new(Arc::clone(&store)),
        Arc::new(MailRelay::with_transport(transport.clone())),
        AccessPolicy::Open,
    );
    let mut input = report_for_bob();
    input.assigned_to_email = Some("bob@example.com".to_string());

    let task = ctl.create(input, &alice()).await.unwrap();

    for _ in 0..200 {
        if *transport.attempts.lock() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*transport.attempts.lock(), 1);

    assert!(store.get(&task.id).await.unwrap().is_some());
    let bobs = inbox(&store, "bob-uid").await;
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].kind, NotificationType::TaskAssigned);
}

#[tokio::test]
async fn title_too_long_is_rejected() {
    let (ctl, store, _) = setup();
    let mut input = report_for_bob();
    input.title = "x".repeat(257);
    assert!(matches!(
        ctl.create(input, &alice()).await,
        Err(TaskError::TitleTooLong { len: 257, .. })
    ));
    assert_eq!(store.task_count(), 0);
}

// ===========================================================================
// Status changes
// ===========================================================================

#[tokio::test]
async fn completion_notifies_assignee_and_creator() {
    let (ctl, store, _) = setup();
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();

    let notified = ctl
        .update_status(&task, TaskStatus::Completed, &bob())
        .await
        .unwrap();
    assert_eq!(notified, 2);

    let bobs = inbox(&store, "bob-uid").await;
    let updates: Vec<&Notification> = bobs
        .iter()
        .filter(|n| n.kind == NotificationType::TaskUpdated)
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].message, "Bob updated \"Write report\" to completed");

    let alices = inbox(&store, "alice-uid").await;
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].kind, NotificationType::TaskCompleted);
    assert_eq!(alices[0].message, "Bob completed the task: \"Write report\"");
}

#[tokio::test]
async fn same_status_produces_no_notifications() {
    let (ctl, store, _) = setup();
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();
    let before = store.notification_count();

    let notified = ctl
        .update_status(&task, TaskStatus::Pending, &bob())
        .await
        .unwrap();
    assert_eq!(notified, 0);
    assert_eq!(store.notification_count(), before);
}

#[tokio::test]
async fn created_at_survives_updates() {
    let (ctl, store, _) = setup();
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();

    ctl.update_status(&task, TaskStatus::InProgress, &bob())
        .await
        .unwrap();
    ctl.update(
        &task.id,
        TaskPatch {
            description: Some("Q4 instead".to_string()),
            ..TaskPatch::default()
        },
        &alice(),
    )
    .await
    .unwrap();

    let stored = store.get(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.created_at, task.created_at);
    assert_eq!(stored.status, TaskStatus::InProgress);
    assert_eq!(stored.description, "Q4 instead");
}

#[tokio::test]
async fn generic_update_sends_no_notifications() {
    let (ctl, store, _) = setup();
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();
    let before = store.notification_count();

    ctl.update(&task.id, TaskPatch::status(TaskStatus::Completed), &bob())
        .await
        .unwrap();
    assert_eq!(store.notification_count(), before);
}

// ===========================================================================
// Delete
// ===========================================================================

#[tokio::test]
async fn deleted_task_disappears_without_notification() {
    let (ctl, store, _) = setup();
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();
    let before = inbox(&store, "bob-uid").await;

    assert!(ctl.delete(&task.id, &alice()).await.unwrap());
    assert!(ctl.get(&task.id).await.unwrap().is_none());
    assert!(ctl.list(&TaskFilter::All).await.unwrap().is_empty());

    let after = inbox(&store, "bob-uid").await;
    assert_eq!(after, before);
    assert!(
        after
            .iter()
            .all(|n| n.kind != NotificationType::TaskDeleted)
    );

    assert!(!ctl.delete(&task.id, &alice()).await.unwrap());
}

#[tokio::test]
async fn member_cannot_delete_under_admin_writes() {
    let store = Arc::new(MemoryStore::new());
    let ctl = TaskController::new(
        Arc::clone(&store),
        NotificationDispatcher::new(Arc::clone(&store)),
        Arc::new(MailRelay::<RecordingTransport>::simulated()),
        AccessPolicy::AdminWrites,
    );
    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();

    assert!(matches!(
        ctl.delete(&task.id, &bob()).await,
        Err(TaskError::Forbidden(_))
    ));
    assert!(store.get(&task.id).await.unwrap().is_some());
}

// ===========================================================================
// Queries
// ===========================================================================

#[tokio::test]
async fn views_filter_and_order() {
    let (ctl, _, _) = setup();
    let first = ctl.create(report_for_bob(), &alice()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let mut other = report_for_bob();
    other.title = "Review budget".to_string();
    other.assigned_to = UserId::new("carol-uid");
    other.assigned_to_name = "Carol".to_string();
    let second = ctl.create(other, &alice()).await.unwrap();

    let all = ctl.list(&TaskFilter::All).await.unwrap();
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);

    let mine = ctl
        .list(&TaskFilter::AssignedTo(UserId::new("bob-uid")))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);

    ctl.update_status(&first, TaskStatus::Completed, &bob())
        .await
        .unwrap();
    let done = ctl
        .list(&TaskFilter::Status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.len(), 1);
    let pending = ctl
        .list(&TaskFilter::Status(TaskStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
}

// ===========================================================================
// Failure isolation
// ===========================================================================

#[tokio::test]
async fn notification_failures_never_fail_task_operations() {
    let tasks = Arc::new(MemoryStore::new());
    let ctl = TaskController::new(
        Arc::clone(&tasks),
        NotificationDispatcher::new(Arc::new(BrokenNotifications::new())),
        Arc::new(MailRelay::<RecordingTransport>::simulated()),
        AccessPolicy::Open,
    );

    let task = ctl.create(report_for_bob(), &alice()).await.unwrap();
    assert!(tasks.get(&task.id).await.unwrap().is_some());

    let notified = ctl
        .update_status(&task, TaskStatus::Completed, &bob())
        .await
        .unwrap();
    assert_eq!(notified, 0);
    assert_eq!(
        tasks.get(&task.id).await.unwrap().unwrap().status,
        TaskStatus::Completed
    );
}
