//! HTTP API: shared state, identity extraction, routes and server startup.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use taskify::auth::AccessPolicy;
use taskify::directory::{IdentityProvider, MemoryDirectory};
use taskify::mail::{EmailSender, MailError, MailRelay, SendOutcome, SmtpMailer};
use taskify::notify::NotificationDispatcher;
use taskify::store::MemoryStore;
use taskify::tasks::TaskController;
use taskify_proto::mail::{SendEmailRequest, SendEmailResponse};
use taskify_proto::notification::{Notification, NotificationId};
use taskify_proto::task::{NewTask, Task, TaskFilter, TaskId, TaskPatch, TaskStats, TaskStatus, TaskView};
use taskify_proto::user::{Actor, UserId, UserProfile};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::feed;

/// Header carrying the authenticated user's uid.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Controller type the server runs.
pub type Controller = TaskController<MemoryStore, MemoryStore, MailRelay<SmtpMailer>, AccessPolicy>;

/// Shared server state.
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub mail: Arc<MailRelay<SmtpMailer>>,
    pub controller: Controller,
}

impl AppState {
    /// Wires a fresh in-memory store to the given directory, mail relay and
    /// policy.
    #[must_use]
    pub fn new(
        directory: MemoryDirectory,
        mail: MailRelay<SmtpMailer>,
        policy: AccessPolicy,
        feed_capacity: usize,
    ) -> Self {
        let store = Arc::new(MemoryStore::with_change_capacity(feed_capacity));
        let mail = Arc::new(mail);
        let controller = TaskController::new(
            Arc::clone(&store),
            NotificationDispatcher::new(Arc::clone(&store)),
            Arc::clone(&mail),
            policy,
        );
        Self {
            store,
            directory: Arc::new(directory),
            mail,
            controller,
        }
    }

    /// Builds state from resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if SMTP credentials are present but the
    /// transport cannot be configured.
    pub fn from_config(config: &ServerConfig) -> Result<Self, MailError> {
        let mail = MailRelay::from_settings(config.smtp.as_ref())?
            .with_dashboard_url(config.dashboard_url.clone());
        let directory = MemoryDirectory::with_profiles(config.users.iter().cloned());
        tracing::info!(users = directory.len(), policy = ?config.access_policy, "state initialized");
        Ok(Self::new(
            directory,
            mail,
            config.access_policy,
            config.feed_capacity,
        ))
    }

    /// The notification dispatcher shared with the controller.
    #[must_use]
    pub const fn notifier(&self) -> &NotificationDispatcher<MemoryStore> {
        self.controller.notifier()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            MemoryDirectory::new(),
            MailRelay::simulated(),
            AccessPolicy::AdminWrites,
            256,
        )
    }
}

/// The authenticated caller, resolved from the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthenticated)?;
        state
            .directory
            .actor(&UserId::new(uid))
            .map(Self)
            .ok_or_else(|| ApiError::UnknownUser(uid.to_string()))
    }
}

/// Parses a `?filter=` value; absent means `all`.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] for an unknown view name.
pub fn parse_view(raw: Option<&str>) -> Result<TaskView, ApiError> {
    match raw {
        None | Some("") => Ok(TaskView::All),
        Some(name) => serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map_err(|_| ApiError::BadRequest(format!("unknown filter: {name}"))),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("task {raw}")))
}

fn parse_notification_id(raw: &str) -> Result<NotificationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("notification {raw}")))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: TaskStatus,
    #[serde(default)]
    pub previous_status: Option<TaskStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResult {
    pub status: TaskStatus,
    pub notified: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllRead {
    pub ids: Vec<NotificationId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn me(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .directory
        .profile(&actor.uid)
        .map(Json)
        .ok_or_else(|| ApiError::UnknownUser(actor.uid.to_string()))
}

async fn users(State(state): State<Arc<AppState>>, _actor: CurrentActor) -> Json<Vec<UserProfile>> {
    Json(state.directory.profiles())
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = view_filter(query.filter.as_deref(), &actor.uid)?;
    Ok(Json(state.controller.list(&filter).await?))
}

async fn task_stats(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<ListQuery>,
) -> Result<Json<TaskStats>, ApiError> {
    let filter = view_filter(query.filter.as_deref(), &actor.uid)?;
    Ok(Json(state.controller.stats(&filter).await?))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(new_task) = payload?;
    let task = state.controller.create(new_task, &actor).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    _actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&id)?;
    state
        .controller
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("task {id}")))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;
    let Json(patch) = payload?;
    state.controller.update(&id, patch, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<StatusChangeResult>, ApiError> {
    let id = parse_task_id(&id)?;
    let Json(change) = payload?;
    let notified = state
        .controller
        .set_status(&id, change.status, change.previous_status, &actor)
        .await?;
    Ok(Json(StatusChangeResult {
        status: change.status,
        notified,
    }))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id)?;
    if state.controller.delete(&id, &actor).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("task {id}")))
    }
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<NotificationList>, ApiError> {
    let inbox = state.notifier().snapshot(&actor.uid).await?;
    Ok(Json(NotificationList {
        notifications: inbox.notifications,
        unread: inbox.unread,
    }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_notification_id(&id)?;
    let inbox = state.notifier().snapshot(&actor.uid).await?;
    if !inbox.notifications.iter().any(|n| n.id == id) {
        return Err(ApiError::NotFound(format!("notification {id}")));
    }
    state.notifier().mark_read(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    payload: Result<Json<MarkAllRead>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload?;
    let inbox = state.notifier().snapshot(&actor.uid).await?;
    let owned: Vec<NotificationId> = body
        .ids
        .into_iter()
        .filter(|id| inbox.notifications.iter().any(|n| n.id == *id))
        .collect();
    state.notifier().mark_all_read(&actor.uid, &owned).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "malformed send-email request");
            return (
                StatusCode::BAD_REQUEST,
                Json(SendEmailResponse::failed(
                    "Invalid request body",
                    rejection.body_text(),
                )),
            )
                .into_response();
        }
    };

    tracing::info!(to = %request.to, subject = %request.subject(), "processing email request");
    match state.mail.send_task_email(&request).await {
        Ok(SendOutcome::Sent { message_id }) => {
            Json(SendEmailResponse::sent(&request, message_id)).into_response()
        }
        Ok(SendOutcome::Simulated) => Json(SendEmailResponse::simulated(&request)).into_response(),
        Err(e) => {
            tracing::error!(to = %request.to, error = %e, "email sending failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendEmailResponse::failed("Failed to send email", e.to_string())),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Router and startup
// ---------------------------------------------------------------------------

/// Builds the full router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/users", get(users))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/stats", get(task_stats))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/status", put(update_status))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/send-email", post(send_email))
        .route("/ws/notifications", get(feed::notifications_ws))
        .route("/ws/tasks", get(feed::tasks_ws))
        .with_state(state)
}

/// Starts the server on `addr` with an empty default state and returns the
/// bound address.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::default())).await
}

/// Starts the server with a pre-built [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Resolves `?filter=` against the viewing user.
pub(crate) fn view_filter(raw: Option<&str>, viewer: &UserId) -> Result<TaskFilter, ApiError> {
    Ok(parse_view(raw)?.into_filter(viewer))
}
