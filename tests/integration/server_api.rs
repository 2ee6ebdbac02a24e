//! Integration tests for the HTTP API and WebSocket feeds.
//!
//! Each test starts an in-process server on an OS-assigned port with two
//! seeded users: Alice (admin) and Bob (member).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{Value, json};
use taskify::auth::AccessPolicy;
use taskify::directory::MemoryDirectory;
use taskify::mail::MailRelay;
use taskify_proto::codec;
use taskify_proto::feed::FeedEvent;
use taskify_proto::user::{Role, UserId, UserProfile};
use taskify_server::api::{self, AppState, USER_ID_HEADER};
use tokio_tungstenite::tungstenite;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn profile(uid: &str, name: &str, role: Role) -> UserProfile {
    UserProfile {
        uid: UserId::new(uid),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
    }
}

struct TestServer {
    addr: std::net::SocketAddr,
    http: reqwest::Client,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(policy: AccessPolicy) -> Self {
        let directory = MemoryDirectory::with_profiles([
            profile("alice-uid", "Alice", Role::Admin),
            profile("bob-uid", "Bob", Role::Member),
        ]);
        let state = Arc::new(AppState::new(directory, MailRelay::simulated(), policy, 64));
        let (addr, handle) = api::start_server_with_state("127.0.0.1:0", state)
            .await
            .unwrap();
        Self {
            addr,
            http: reqwest::Client::new(),
            _handle: handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    fn get(&self, uid: &str, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).header(USER_ID_HEADER, uid)
    }

    fn post(&self, uid: &str, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path)).header(USER_ID_HEADER, uid)
    }

    async fn create_report(&self) -> Value {
        let response = self
            .post("alice-uid", "/api/tasks")
            .json(&json!({
                "title": "Write report",
                "description": "Q3 summary",
                "assignedTo": "bob-uid",
                "assignedToName": "Bob"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    async fn ws(
        &self,
        path: &str,
    ) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>
    {
        let url = format!("ws://{}{path}", self.addr);
        let (ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        ws
    }
}

async fn next_event<S>(ws: &mut S) -> FeedEvent
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("no frame within 2s")
            .expect("stream ended")
            .expect("websocket error");
        if let tungstenite::Message::Text(text) = msg {
            return codec::decode(text.as_str()).unwrap();
        }
    }
}

// ===========================================================================
// Identity
// ===========================================================================

#[tokio::test]
async fn requests_need_a_known_user() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;

    let response = server.http.get(server.url("/api/tasks")).send().await.unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let response = server.get("mallory", "/api/tasks").send().await.unwrap();
    assert_eq!(response.status(), 401);

    let me: Value = server
        .get("bob-uid", "/api/me")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["name"], "Bob");
    assert_eq!(me["role"], "member");

    let users: Vec<Value> = server
        .get("bob-uid", "/api/users")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["name"], "Alice");
}

// ===========================================================================
// Tasks
// ===========================================================================

#[tokio::test]
async fn create_list_and_complete() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let task = server.create_report().await;
    assert_eq!(task["createdBy"], "alice-uid");
    assert_eq!(task["createdByName"], "Alice");
    assert_eq!(task["status"], "pending");
    let id = task["id"].as_str().unwrap().to_string();

    let mine: Vec<Value> = server
        .get("bob-uid", "/api/tasks?filter=my-tasks")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    let response = server
        .http
        .put(server.url(&format!("/api/tasks/{id}/status")))
        .header(USER_ID_HEADER, "bob-uid")
        .json(&json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["status"], "completed");
    assert_eq!(result["notified"], 2);

    let stats: Value = server
        .get("alice-uid", "/api/tasks/stats")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["completionRate"], 100);

    let alice_inbox: Value = server
        .get("alice-uid", "/api/notifications")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alice_inbox["unread"], 1);
    assert_eq!(alice_inbox["notifications"][0]["type"], "task_completed");
}

#[tokio::test]
async fn previous_status_is_honored() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let task = server.create_report().await;
    let id = task["id"].as_str().unwrap();

    let result: Value = server
        .http
        .put(server.url(&format!("/api/tasks/{id}/status")))
        .header(USER_ID_HEADER, "bob-uid")
        .json(&json!({ "status": "in-progress", "previousStatus": "in-progress" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["notified"], 0);
}

#[tokio::test]
async fn validation_and_policy_errors() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;

    let response = server
        .post("alice-uid", "/api/tasks")
        .json(&json!({ "title": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);

    let response = server
        .post("bob-uid", "/api/tasks")
        .json(&json!({ "title": "Sneaky" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .get("alice-uid", "/api/tasks?filter=archived")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn patch_cannot_touch_creation_fields() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let task = server.create_report().await;
    let id = task["id"].as_str().unwrap();

    let response = server
        .http
        .patch(server.url(&format!("/api/tasks/{id}")))
        .header(USER_ID_HEADER, "bob-uid")
        .json(&json!({ "createdBy": "bob-uid" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    let response = server
        .http
        .patch(server.url(&format!("/api/tasks/{id}")))
        .header(USER_ID_HEADER, "bob-uid")
        .json(&json!({ "title": "Write final report" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let stored: Value = server
        .get("bob-uid", &format!("/api/tasks/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["title"], "Write final report");
    assert_eq!(stored["createdBy"], "alice-uid");
    assert_eq!(stored["createdAt"], task["createdAt"]);
}

#[tokio::test]
async fn delete_then_404() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let task = server.create_report().await;
    let id = task["id"].as_str().unwrap();
    let path = format!("/api/tasks/{id}");

    let response = server
        .http
        .delete(server.url(&path))
        .header(USER_ID_HEADER, "bob-uid")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    for expected in [204, 404] {
        let response = server
            .http
            .delete(server.url(&path))
            .header(USER_ID_HEADER, "alice-uid")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected);
    }

    let response = server.get("alice-uid", &path).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

// ===========================================================================
// Notifications
// ===========================================================================

#[tokio::test]
async fn mark_read_endpoints() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    server.create_report().await;
    server.create_report().await;

    let inbox: Value = server
        .get("bob-uid", "/api/notifications")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox["unread"], 2);
    let first = inbox["notifications"][0]["id"].as_str().unwrap().to_string();
    let second = inbox["notifications"][1]["id"].as_str().unwrap().to_string();

    // Alice cannot mark Bob's notification.
    let response = server
        .post("alice-uid", &format!("/api/notifications/{first}/read"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = server
        .post("bob-uid", &format!("/api/notifications/{first}/read"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = server
        .post("bob-uid", "/api/notifications/read-all")
        .json(&json!({ "ids": [first, second] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let inbox: Value = server
        .get("bob-uid", "/api/notifications")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox["unread"], 0);
}

// ===========================================================================
// Live feeds
// ===========================================================================

#[tokio::test]
async fn notification_feed_pushes_new_assignments() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let mut ws = server.ws("/ws/notifications?uid=bob-uid").await;

    match next_event(&mut ws).await {
        FeedEvent::Notifications {
            notifications,
            unread,
        } => {
            assert!(notifications.is_empty());
            assert_eq!(unread, 0);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    server.create_report().await;

    loop {
        if let FeedEvent::Notifications {
            notifications,
            unread,
        } = next_event(&mut ws).await
        {
            if notifications.len() == 1 {
                assert_eq!(unread, 1);
                assert!(notifications[0].message.contains("Write report"));
                break;
            }
        }
    }
}

#[tokio::test]
async fn task_feed_carries_stats() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let mut ws = server.ws("/ws/tasks?uid=bob-uid&filter=my-tasks").await;

    assert!(matches!(
        next_event(&mut ws).await,
        FeedEvent::Tasks { ref tasks, .. } if tasks.is_empty()
    ));

    server.create_report().await;

    loop {
        if let FeedEvent::Tasks { tasks, stats } = next_event(&mut ws).await {
            if tasks.len() == 1 {
                assert_eq!(stats.total, 1);
                assert_eq!(stats.pending, 1);
                assert_eq!(stats.completion_rate, 0);
                break;
            }
        }
    }
}

#[tokio::test]
async fn feed_rejects_unknown_user() {
    let server = TestServer::start(AccessPolicy::AdminWrites).await;
    let url = format!("ws://{}/ws/notifications?uid=mallory", server.addr);
    assert!(tokio_tungstenite::connect_async(&url).await.is_err());
}
