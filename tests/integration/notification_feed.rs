//! Integration tests for live notification and task queries.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskify::auth::AccessPolicy;
use taskify::mail::{MailRelay, SmtpMailer};
use taskify::notify::NotificationDispatcher;
use taskify::store::MemoryStore;
use taskify::tasks::TaskController;
use taskify_proto::notification::{Notification, NotificationId, NotificationType};
use taskify_proto::task::{NewTask, Task, TaskFilter, TaskStatus};
use taskify_proto::user::{Actor, Role, UserId};
use tokio::sync::mpsc;

type Controller = TaskController<MemoryStore, MemoryStore, MailRelay<SmtpMailer>>;

fn setup() -> (Controller, NotificationDispatcher<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = NotificationDispatcher::new(Arc::clone(&store));
    let ctl = TaskController::new(
        store,
        notifier.clone(),
        Arc::new(MailRelay::simulated()),
        AccessPolicy::Open,
    );
    (ctl, notifier)
}

fn alice() -> Actor {
    Actor::new("alice-uid", "Alice", Role::Admin)
}

fn bob() -> Actor {
    Actor::new("bob-uid", "Bob", Role::Member)
}

fn task_for_bob(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: String::new(),
        status: TaskStatus::Pending,
        assigned_to: UserId::new("bob-uid"),
        assigned_to_name: "Bob".to_string(),
        assigned_to_email: None,
    }
}

async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no delivery within 2s")
        .expect("feed closed")
}

/// Waits until a delivery satisfies `pred`, returning it.
async fn next_matching<T>(rx: &mut mpsc::UnboundedReceiver<T>, pred: impl Fn(&T) -> bool) -> T {
    loop {
        let item = next(rx).await;
        if pred(&item) {
            return item;
        }
    }
}

#[tokio::test]
async fn notification_feed_follows_assignments() {
    let (ctl, notifier) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Notification>>();
    let _sub = notifier.subscribe(UserId::new("bob-uid"), move |list| {
        let _ = tx.send(list);
    });

    assert!(next(&mut rx).await.is_empty());

    ctl.create(task_for_bob("Write report"), &alice()).await.unwrap();
    let list = next_matching(&mut rx, |l| l.len() == 1).await;
    assert_eq!(list[0].kind, NotificationType::TaskAssigned);

    tokio::time::sleep(Duration::from_millis(5)).await;
    ctl.create(task_for_bob("Review budget"), &alice()).await.unwrap();
    let list = next_matching(&mut rx, |l| l.len() == 2).await;
    assert_eq!(list[0].metadata.task_title.as_deref(), Some("Review budget"));
    assert_eq!(list[1].metadata.task_title.as_deref(), Some("Write report"));
}

#[tokio::test]
async fn mark_all_read_is_seen_by_feed() {
    let (ctl, notifier) = setup();
    ctl.create(task_for_bob("A"), &alice()).await.unwrap();
    ctl.create(task_for_bob("B"), &alice()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Notification>>();
    let _sub = notifier.subscribe(UserId::new("bob-uid"), move |list| {
        let _ = tx.send(list);
    });
    let initial = next(&mut rx).await;
    assert_eq!(initial.iter().filter(|n| !n.read).count(), 2);

    let ids: Vec<NotificationId> = initial.iter().map(|n| n.id.clone()).collect();
    notifier
        .mark_all_read(&UserId::new("bob-uid"), &ids)
        .await
        .unwrap();

    let list = next_matching(&mut rx, |l| l.iter().all(|n| n.read)).await;
    assert_eq!(list.len(), 2);
    assert_eq!(
        notifier.snapshot(&UserId::new("bob-uid")).await.unwrap().unread,
        0
    );
}

#[tokio::test]
async fn unsubscribed_feed_stops_delivering() {
    let (ctl, notifier) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Notification>>();
    let sub = notifier.subscribe(UserId::new("bob-uid"), move |list| {
        let _ = tx.send(list);
    });
    next(&mut rx).await;

    sub.unsubscribe();
    ctl.create(task_for_bob("Late"), &alice()).await.unwrap();

    let end = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("channel should close");
    assert!(end.is_none());
}

#[tokio::test]
async fn task_feed_tracks_filter() {
    let (ctl, _) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Task>>();
    let _sub = ctl.subscribe(TaskFilter::Status(TaskStatus::Completed), move |tasks| {
        let _ = tx.send(tasks);
    });
    assert!(next(&mut rx).await.is_empty());

    let task = ctl.create(task_for_bob("Write report"), &alice()).await.unwrap();
    ctl.update_status(&task, TaskStatus::Completed, &bob())
        .await
        .unwrap();

    let done = next_matching(&mut rx, |t| !t.is_empty()).await;
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, task.id);

    ctl.delete(&task.id, &alice()).await.unwrap();
    let after = next_matching(&mut rx, Vec::is_empty).await;
    assert!(after.is_empty());
}
