//! Live WebSocket feeds.
//!
//! Each connection owns one live query. Snapshots flow from the query
//! callback through an unbounded channel to a writer task that encodes them
//! as JSON text frames. A reader task watches for the client going away.
//! When either task ends the other is aborted and the query released.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use taskify::directory::IdentityProvider;
use taskify::store::Subscription;
use taskify_proto::codec;
use taskify_proto::feed::FeedEvent;
use taskify_proto::user::{Actor, UserId};
use tokio::sync::mpsc;

use crate::api::{AppState, view_filter};
use crate::error::ApiError;

/// Query string for feed endpoints.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub uid: Option<String>,
    pub filter: Option<String>,
}

fn resolve_actor(state: &AppState, uid: Option<&str>) -> Result<Actor, ApiError> {
    let uid = uid
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::Unauthenticated)?;
    state
        .directory
        .actor(&UserId::new(uid))
        .ok_or_else(|| ApiError::UnknownUser(uid.to_string()))
}

/// `GET /ws/notifications?uid=`
pub async fn notifications_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let actor = resolve_actor(&state, query.uid.as_deref())?;
    let label = format!("notifications:{}", actor.uid);
    Ok(ws
        .on_upgrade(move |socket| {
            run_feed(socket, label, move |tx| {
                state.notifier().subscribe(actor.uid, move |list| {
                    let _ = tx.send(FeedEvent::notifications(list));
                })
            })
        })
        .into_response())
}

/// `GET /ws/tasks?uid=&filter=`
pub async fn tasks_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, ApiError> {
    let actor = resolve_actor(&state, query.uid.as_deref())?;
    let filter = view_filter(query.filter.as_deref(), &actor.uid)?;
    let label = format!("tasks:{}", actor.uid);
    Ok(ws
        .on_upgrade(move |socket| {
            run_feed(socket, label, move |tx| {
                state.controller.subscribe(filter, move |tasks| {
                    let _ = tx.send(FeedEvent::tasks(tasks));
                })
            })
        })
        .into_response())
}

fn encode_frame(label: &str, event: &FeedEvent) -> Option<String> {
    match codec::encode(event) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(feed = %label, error = %e, "failed to encode feed event");
            codec::encode(&FeedEvent::Error {
                reason: e.to_string(),
            })
            .ok()
        }
    }
}

/// Drives one feed connection until either side goes away.
async fn run_feed<S>(socket: WebSocket, label: String, subscribe: S)
where
    S: FnOnce(mpsc::UnboundedSender<FeedEvent>) -> Subscription,
{
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<FeedEvent>();
    let subscription = subscribe(tx);
    tracing::info!(feed = %label, "feed opened");

    let writer_label = label.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(text) = encode_frame(&writer_label, &event) else {
                break;
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                tracing::warn!(feed = %writer_label, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_label = label.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let Message::Close(_) = msg {
                tracing::debug!(feed = %reader_label, "received close frame");
                break;
            }
            // Clients have nothing to say on a feed; other frames are ignored.
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    subscription.unsubscribe();
    tracing::info!(feed = %label, "feed closed");
}
