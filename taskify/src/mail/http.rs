//! Client for a remote `/api/send-email` relay.

use taskify_proto::mail::{SendEmailRequest, SendEmailResponse};
use url::Url;

use super::{EmailSender, MailError, SendOutcome};

/// Path of the relay endpoint relative to the service root.
pub const SEND_EMAIL_PATH: &str = "api/send-email";

/// Posts assignment emails to a relay service.
#[derive(Debug, Clone)]
pub struct HttpMailClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpMailClient {
    /// Creates a client for the service rooted at `base_url`
    /// (for example `http://127.0.0.1:3000/`).
    ///
    /// # Errors
    ///
    /// Returns [`MailError::InvalidEndpoint`] if the URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, MailError> {
        let endpoint = Url::parse(base_url)?.join(SEND_EMAIL_PATH)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl EmailSender for HttpMailClient {
    async fn send_task_email(&self, request: &SendEmailRequest) -> Result<SendOutcome, MailError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body: SendEmailResponse = response.json().await?;

        if !body.success {
            let reason = body
                .details
                .as_ref()
                .and_then(|d| d.as_str().map(str::to_string))
                .or(body.error)
                .unwrap_or_else(|| status.to_string());
            tracing::warn!(%status, %reason, "relay rejected email");
            return Err(MailError::Rejected(reason));
        }

        if body.is_simulated() {
            return Ok(SendOutcome::Simulated);
        }
        Ok(SendOutcome::Sent {
            message_id: body.message_id.unwrap_or_default(),
        })
    }
}
