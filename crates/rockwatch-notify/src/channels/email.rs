use super::with_timeout;
use crate::error::{NotifyError, Result};
use crate::{ChannelReport, RecipientResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rockwatch_common::types::Channel;
use std::sync::Arc;
use std::time::Duration;

/// Sends one HTML message to a list of recipients.
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()>;
}

pub struct SmtpEmailGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailGateway {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidConfig(format!("invalid from address '{from}': {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailGateway for SmtpEmailGateway {
    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);
        for recipient in recipients {
            let mailbox = recipient
                .parse::<Mailbox>()
                .map_err(|e| NotifyError::Provider(format!("invalid recipient '{recipient}': {e}")))?;
            builder = builder.to(mailbox);
        }
        let email = builder
            .body(html_body.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// Single-attempt email adapter. Transient SMTP failures are reported, not
/// retried.
pub struct EmailChannel {
    gateway: Option<Arc<dyn EmailGateway>>,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(gateway: Option<Arc<dyn EmailGateway>>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    pub async fn deliver(&self, recipients: &[String], subject: &str, html_body: &str) -> ChannelReport {
        let Some(gateway) = &self.gateway else {
            return ChannelReport::skipped(Channel::Email, NotifyError::NotConfigured("email".into()));
        };
        if recipients.is_empty() {
            return ChannelReport::skipped(Channel::Email, NotifyError::NoRecipients("email".into()));
        }

        match with_timeout("email", self.timeout, gateway.send(recipients, subject, html_body)).await {
            Ok(()) => {
                tracing::info!(recipients = recipients.len(), "Email alert sent");
                ChannelReport::from_recipients(
                    Channel::Email,
                    recipients
                        .iter()
                        .map(|r| RecipientResult::success(r, None))
                        .collect(),
                )
            }
            Err(e) => {
                tracing::error!(recipients = recipients.len(), error = %e, "Email alert failed");
                ChannelReport::provider_failure(Channel::Email, recipients, e)
            }
        }
    }
}
