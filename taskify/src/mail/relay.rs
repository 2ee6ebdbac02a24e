//! Local mail relay: render, then deliver or simulate.

use taskify_proto::mail::SendEmailRequest;

use super::smtp::{SmtpMailer, SmtpSettings};
use super::template::{DEFAULT_DASHBOARD_URL, render_assignment_html};
use super::{EmailSender, MailError, MailTransport, OutgoingEmail, SendOutcome};

/// Renders assignment emails and hands them to a transport.
///
/// With no transport every send is simulated: the would-be email is logged
/// and nothing touches the network.
pub struct MailRelay<T> {
    transport: Option<T>,
    dashboard_url: String,
}

impl<T: MailTransport> MailRelay<T> {
    /// A relay that delivers through `transport`.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Some(transport),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }

    /// A relay that never sends.
    #[must_use]
    pub fn simulated() -> Self {
        Self {
            transport: None,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
        }
    }

    /// Sets the dashboard link embedded in emails.
    #[must_use]
    pub fn with_dashboard_url(mut self, url: impl Into<String>) -> Self {
        self.dashboard_url = url.into();
        self
    }

    /// `true` when sends are simulated.
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        self.transport.is_none()
    }
}

impl MailRelay<SmtpMailer> {
    /// Builds an SMTP relay, or a simulated one when `settings` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be configured.
    pub fn from_settings(settings: Option<&SmtpSettings>) -> Result<Self, MailError> {
        match settings {
            Some(settings) => Ok(Self::with_transport(SmtpMailer::new(settings)?)),
            None => {
                tracing::warn!("smtp credentials not configured, emails will be simulated");
                Ok(Self::simulated())
            }
        }
    }
}

impl<T: MailTransport> EmailSender for MailRelay<T> {
    async fn send_task_email(&self, request: &SendEmailRequest) -> Result<SendOutcome, MailError> {
        let Some(transport) = &self.transport else {
            tracing::info!(
                to = %request.to,
                subject = %request.subject(),
                assigned_by = %request.assigned_by,
                "email simulated"
            );
            return Ok(SendOutcome::Simulated);
        };

        let email = OutgoingEmail {
            to: request.to.clone(),
            to_name: request.to_name.clone(),
            subject: format!("🎯 {}", request.subject()),
            html: render_assignment_html(request, &self.dashboard_url),
        };
        let message_id = transport.deliver(&email).await?;
        tracing::info!(to = %request.to, %message_id, "email sent");
        Ok(SendOutcome::Sent { message_id })
    }
}
