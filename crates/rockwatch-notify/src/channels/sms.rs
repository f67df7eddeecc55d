use super::with_timeout;
use crate::error::{NotifyError, Result};
use crate::formatter::SmsVariant;
use crate::{ChannelReport, RecipientResult};
use async_trait::async_trait;
use rockwatch_common::types::Channel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Status reported by an SMS provider for a submitted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Undelivered,
    Other(String),
}

impl DeliveryStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "queued" | "accepted" => DeliveryStatus::Queued,
            "sent" | "sending" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "failed" => DeliveryStatus::Failed,
            "undelivered" => DeliveryStatus::Undelivered,
            other => DeliveryStatus::Other(other.to_string()),
        }
    }

    /// Queued, sent and delivered all count as an accepted send.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Queued | DeliveryStatus::Sent | DeliveryStatus::Delivered
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Queued => write!(f, "queued"),
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
            DeliveryStatus::Undelivered => write!(f, "undelivered"),
            DeliveryStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Submits one SMS. The sender number is part of the gateway's configuration.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, body: &str, to: &str) -> Result<DeliveryStatus>;
}

/// Twilio Messages REST API.
pub struct TwilioSmsGateway {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Deserialize)]
struct TwilioResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl TwilioSmsGateway {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(&self, body: &str, to: &str) -> Result<DeliveryStatus> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let parsed: Option<TwilioResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let detail = match parsed {
                Some(TwilioResponse {
                    code: Some(code),
                    message,
                    ..
                }) => format!("Error {code}: {}", message.unwrap_or_default()),
                _ => format!("HTTP {status}: {text}"),
            };
            return Err(NotifyError::Provider(detail));
        }

        Ok(parsed
            .and_then(|p| p.status)
            .map(|s| DeliveryStatus::parse(&s))
            .unwrap_or(DeliveryStatus::Queued))
    }
}

/// Coarse category of an SMS provider error string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmsErrorCategory {
    CarrierBlock,
    InvalidNumber,
    TrialRestriction,
    Other,
}

impl SmsErrorCategory {
    /// Twilio codes 30044 (carrier filtering), 21211 (invalid `To`) and
    /// 21608 (unverified number on a trial account) are recognized, plus
    /// plain-text mentions of "invalid" and "trial".
    pub fn classify(error: &str) -> Self {
        let lower = error.to_lowercase();
        if lower.contains("30044") {
            SmsErrorCategory::CarrierBlock
        } else if lower.contains("21211") || lower.contains("invalid") {
            SmsErrorCategory::InvalidNumber
        } else if lower.contains("21608") || lower.contains("trial") {
            SmsErrorCategory::TrialRestriction
        } else {
            SmsErrorCategory::Other
        }
    }

    /// One-line summary; carrier block outranks invalid number, which
    /// outranks trial restriction.
    pub fn summarize(categories: &[SmsErrorCategory]) -> Option<String> {
        if categories.is_empty() {
            return None;
        }
        let has = |c: SmsErrorCategory| categories.contains(&c);
        let summary = if has(SmsErrorCategory::CarrierBlock) {
            "Carrier blocking detected. Consider a local SMS provider or a paid account."
        } else if has(SmsErrorCategory::InvalidNumber) {
            "Phone number format issues detected. Check number formatting."
        } else if has(SmsErrorCategory::TrialRestriction) {
            "Trial account limitations. Consider upgrading to a paid account."
        } else {
            "Mixed SMS delivery issues. Check network and carrier settings."
        };
        Some(summary.to_string())
    }
}

/// Remediation hints attached when SMS fails for every recipient.
pub fn failure_suggestions() -> Vec<String> {
    [
        "Try a regional SMS provider for local carriers",
        "Use the messaging-app fallback for better delivery",
        "Upgrade the SMS account from trial to paid",
        "Email alerts remain the primary fallback",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// SMS adapter with per-phone message-variant fallback.
pub struct SmsChannel {
    gateway: Option<Arc<dyn SmsGateway>>,
    timeout: Duration,
}

impl SmsChannel {
    pub fn new(gateway: Option<Arc<dyn SmsGateway>>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// For each phone, tries `variants` in order and stops at the first one
    /// the gateway accepts. A phone fails only when every variant fails.
    pub async fn deliver(&self, phones: &[String], variants: &[SmsVariant]) -> ChannelReport {
        let Some(gateway) = &self.gateway else {
            return ChannelReport::skipped(Channel::Sms, NotifyError::NotConfigured("sms".into()));
        };
        if phones.is_empty() {
            return ChannelReport::skipped(Channel::Sms, NotifyError::NoRecipients("sms".into()));
        }

        let mut results = Vec::with_capacity(phones.len());
        let mut raw_errors = Vec::new();
        let mut categories = Vec::new();

        for phone in phones {
            let mut phone_errors = Vec::new();
            let mut accepted = None;

            for (attempt, variant) in variants.iter().enumerate() {
                let outcome = with_timeout("sms", self.timeout, gateway.send(&variant.body, phone)).await;
                let err = match outcome {
                    Ok(status) if status.is_accepted() => {
                        tracing::info!(phone = %phone, variant = variant.name, "SMS accepted");
                        accepted = Some(variant.name);
                        break;
                    }
                    Ok(status) => format!("status {status}"),
                    Err(e) => e.to_string(),
                };
                tracing::warn!(
                    phone = %phone,
                    attempt = attempt + 1,
                    variant = variant.name,
                    error = %err,
                    "SMS variant failed"
                );
                categories.push(SmsErrorCategory::classify(&err));
                phone_errors.push(format!("{phone} [{}]: {err}", variant.name));
            }

            match accepted {
                Some(name) => results.push(RecipientResult::success(phone, Some(name.to_string()))),
                None => {
                    let reason = if phone_errors.is_empty() {
                        "no message variants".to_string()
                    } else {
                        phone_errors.join("; ")
                    };
                    tracing::error!(phone = %phone, "SMS failed for every variant");
                    results.push(RecipientResult::failed(phone, reason));
                }
            }
            raw_errors.extend(phone_errors);
        }

        let mut report = ChannelReport::from_recipients(Channel::Sms, results);
        report.diagnostics = SmsErrorCategory::summarize(&categories);
        report.errors = raw_errors;
        if !report.success {
            report.suggestions = failure_suggestions();
        }
        report
    }
}
