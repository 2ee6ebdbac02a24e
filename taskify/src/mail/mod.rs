//! Assignment emails.
//!
//! Two seams:
//! - [`MailTransport`] puts a fully rendered message on the wire. The
//!   production implementation is [`smtp::SmtpMailer`] (lettre, STARTTLS).
//! - [`EmailSender`] turns a [`SendEmailRequest`] into a delivery outcome.
//!   [`relay::MailRelay`] renders and delivers locally, or simulates when no
//!   credentials are configured; [`http::HttpMailClient`] forwards the
//!   request to a remote relay endpoint.

pub mod http;
pub mod relay;
pub mod smtp;
pub mod template;

pub use http::HttpMailClient;
pub use relay::MailRelay;
pub use smtp::{SmtpMailer, SmtpSettings};

use taskify_proto::mail::SendEmailRequest;

/// Errors that can occur while sending an email.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid relay endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The remote relay answered with `success: false`.
    #[error("relay rejected the email: {0}")]
    Rejected(String),
}

/// What happened to an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the mail server, which assigned `message_id`.
    Sent { message_id: String },
    /// No credentials configured; nothing left the process.
    Simulated,
}

/// A rendered message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

/// Delivers rendered messages.
pub trait MailTransport: Send + Sync + 'static {
    /// Sends `email` and returns its message id.
    fn deliver(
        &self,
        email: &OutgoingEmail,
    ) -> impl std::future::Future<Output = Result<String, MailError>> + Send;
}

/// Sends task assignment emails.
pub trait EmailSender: Send + Sync + 'static {
    /// Sends (or simulates) the assignment email described by `request`.
    fn send_task_email(
        &self,
        request: &SendEmailRequest,
    ) -> impl std::future::Future<Output = Result<SendOutcome, MailError>> + Send;
}
