//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskify::notify::DispatchError;
use taskify::store::StoreError;
use taskify::tasks::TaskError;

/// Errors returned by API handlers, rendered as
/// `{"success": false, "error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing x-user-id header")]
    Unauthenticated,

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::UnknownUser(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody(rejection) => rejection.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Task(err) => match err {
                TaskError::TitleEmpty | TaskError::TitleTooLong { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                TaskError::NotFound(_) => StatusCode::NOT_FOUND,
                TaskError::Forbidden(_) => StatusCode::FORBIDDEN,
                TaskError::Store(store) => store_status(store),
            },
            Self::Dispatch(err) => match err {
                DispatchError::Store(store) => store_status(store),
                DispatchError::MarkAllRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
