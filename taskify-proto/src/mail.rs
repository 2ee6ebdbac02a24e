//! Wire contract of the `POST /api/send-email` relay endpoint.
//!
//! Request and response field names are fixed; existing web clients post
//! and parse these exact shapes.

use serde::{Deserialize, Serialize};

/// Body of a send-email request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    /// Recipient address.
    pub to: String,
    /// Recipient display name.
    pub to_name: String,
    pub task_title: String,
    pub task_description: String,
    /// Display name of the person who assigned the task.
    pub assigned_by: String,
}

impl SendEmailRequest {
    /// Subject line reported back to callers.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("New Task Assigned: {}", self.task_title)
    }
}

/// Body of a send-email response, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub success: bool,
    /// Present and `true` when no SMTP transport is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Object on success, reason string on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl SendEmailResponse {
    /// Response for a message accepted by the SMTP server.
    #[must_use]
    pub fn sent(request: &SendEmailRequest, message_id: String) -> Self {
        Self {
            success: true,
            simulated: None,
            message: Some("Email notification sent successfully".to_string()),
            details: Some(serde_json::json!({
                "to": request.to,
                "subject": request.subject(),
                "messageId": message_id,
            })),
            message_id: Some(message_id),
            error: None,
        }
    }

    /// Response when delivery was skipped because no transport is configured.
    #[must_use]
    pub fn simulated(request: &SendEmailRequest) -> Self {
        Self {
            success: true,
            simulated: Some(true),
            message_id: None,
            message: Some(
                "Email simulated (configure SMTP credentials to send real emails)".to_string(),
            ),
            error: None,
            details: Some(serde_json::json!({
                "to": request.to,
                "subject": request.subject(),
            })),
        }
    }

    /// Failure response; `error` is a fixed summary, `details` the reason.
    #[must_use]
    pub fn failed(error: &str, details: impl Into<String>) -> Self {
        Self {
            success: false,
            simulated: None,
            message_id: None,
            message: None,
            error: Some(error.to_string()),
            details: Some(serde_json::Value::String(details.into())),
        }
    }

    /// `true` when the relay reported a simulated send.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.simulated.unwrap_or(false)
    }
}
