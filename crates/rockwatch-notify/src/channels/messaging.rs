use super::with_timeout;
use crate::error::{NotifyError, Result};
use crate::utils::{normalize_phone, truncate_string};
use crate::{ChannelReport, RecipientResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rockwatch_common::types::Channel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Gateway confirmation that a message was queued for later delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAck {
    pub phone: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Chat-app gateway that delivers at a requested time rather than immediately.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn schedule(&self, phone: &str, message: &str, send_at: DateTime<Utc>) -> Result<ScheduledAck>;
}

/// Posts `{phone, message, send_at}` as JSON to a scheduling webhook.
pub struct WebhookMessagingGateway {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct WebhookAck {
    #[serde(default, alias = "id")]
    reference: Option<String>,
}

impl WebhookMessagingGateway {
    pub fn new(client: reqwest::Client, url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl MessagingGateway for WebhookMessagingGateway {
    async fn schedule(&self, phone: &str, message: &str, send_at: DateTime<Utc>) -> Result<ScheduledAck> {
        let payload = serde_json::json!({
            "phone": phone,
            "message": message,
            "send_at": send_at.to_rfc3339(),
        });

        let mut req = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(NotifyError::Provider(format!(
                "HTTP {status}: {}",
                truncate_string(&text, 500, "...")
            )));
        }

        let reference = serde_json::from_str::<WebhookAck>(&text)
            .ok()
            .and_then(|a| a.reference);
        Ok(ScheduledAck {
            phone: phone.to_string(),
            scheduled_for: send_at,
            reference,
        })
    }
}

/// Best-effort fallback after SMS fails for everyone.
pub struct MessagingChannel {
    gateway: Option<Arc<dyn MessagingGateway>>,
    timeout: Duration,
    lead_time: chrono::Duration,
    country_code: String,
}

impl MessagingChannel {
    pub fn new(
        gateway: Option<Arc<dyn MessagingGateway>>,
        timeout: Duration,
        lead_time: chrono::Duration,
        country_code: &str,
    ) -> Self {
        Self {
            gateway,
            timeout,
            lead_time,
            country_code: country_code.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// Schedules `message` for every phone at `now + lead_time`.
    pub async fn deliver(&self, phones: &[String], message: &str, now: DateTime<Utc>) -> ChannelReport {
        let Some(gateway) = &self.gateway else {
            return ChannelReport::skipped(
                Channel::Messaging,
                NotifyError::NotConfigured("messaging".into()),
            );
        };
        if phones.is_empty() {
            return ChannelReport::skipped(
                Channel::Messaging,
                NotifyError::NoRecipients("messaging".into()),
            );
        }

        let send_at = now + self.lead_time;
        let mut results = Vec::with_capacity(phones.len());

        for raw in phones {
            let phone = normalize_phone(raw, &self.country_code);
            match with_timeout("messaging", self.timeout, gateway.schedule(&phone, message, send_at)).await {
                Ok(ack) => {
                    tracing::info!(
                        phone = %phone,
                        scheduled_for = %ack.scheduled_for.format("%H:%M"),
                        "Messaging alert scheduled"
                    );
                    results.push(RecipientResult::success(
                        &phone,
                        Some(format!("scheduled {}", ack.scheduled_for.to_rfc3339())),
                    ));
                }
                Err(e) => {
                    tracing::warn!(phone = %phone, error = %e, "Messaging alert failed");
                    results.push(RecipientResult::failed(&phone, e.to_string()));
                }
            }
        }

        let mut report = ChannelReport::from_recipients(Channel::Messaging, results);
        if report.failed > 0 {
            report.diagnostics = Some(format!("{} messaging delivery issues", report.failed));
        }
        report
    }
}
