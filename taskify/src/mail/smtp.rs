//! SMTP delivery via lettre.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, MailTransport, OutgoingEmail};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SENDER_NAME: &str = "Taskify App";

/// Connection and sender settings for [`SmtpMailer`].
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_name: String,
    /// Applied to connect, greeting and each command.
    pub timeout: Duration,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender_name", &self.sender_name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SmtpSettings {
    /// Builds settings with defaults from a username and app password.
    ///
    /// Returns `None` unless both are present and non-blank, which callers
    /// treat as "simulate". Whitespace inside the password is removed, since
    /// app passwords are often pasted in space-separated groups.
    #[must_use]
    pub fn from_credentials(username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username?.trim().to_string();
        let password: String = password?.chars().filter(|c| !c.is_whitespace()).collect();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            username,
            password,
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            timeout: DEFAULT_SMTP_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// STARTTLS SMTP transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport. No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Address`] if the username is not an email
    /// address, or [`MailError::Smtp`] if the relay cannot be configured.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let sender = Mailbox::new(Some(settings.sender_name.clone()), settings.username.parse()?);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        tracing::info!(host = %settings.host, port = settings.port, "smtp transport configured");
        Ok(Self { transport, sender })
    }
}

/// Generates an RFC 5322 message id.
fn new_message_id() -> String {
    format!("<{}@taskify>", uuid::Uuid::now_v7())
}

impl MailTransport for SmtpMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let recipient = Mailbox::new(Some(email.to_name.clone()), email.to.parse()?);
        let message_id = new_message_id();
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())?;

        let response = self.transport.send(message).await?;
        tracing::debug!(code = %response.code(), "smtp server accepted message");
        Ok(message_id)
    }
}
