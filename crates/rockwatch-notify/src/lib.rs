//! Alert delivery: recipient routing, message formatting, channel adapters
//! and the dispatcher that ties them together.
//!
//! Each delivery mechanism (email, SMS, chat-app messaging) is a channel
//! adapter wrapping a gateway trait. Adapters never return errors; they
//! produce a [`ChannelReport`] that the [`dispatcher::Dispatcher`]
//! aggregates into a single [`dispatcher::DispatchResult`].

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod recipients;
pub mod utils;

#[cfg(test)]
mod tests;

use error::{FailureKind, NotifyError};
use rockwatch_common::types::Channel;
use serde::Serialize;

/// Outcome for one endpoint (address or phone number).
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct RecipientResult {
    pub recipient: String,
    /// `"success"` or `"failed"`.
    pub status: String,
    /// Which SMS variant was accepted, or when a message was scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientResult {
    pub fn success(recipient: &str, detail: Option<String>) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: "success".to_string(),
            detail,
            error: None,
        }
    }

    pub fn failed(recipient: &str, error: String) -> Self {
        Self {
            recipient: recipient.to_string(),
            status: "failed".to_string(),
            detail: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Structured result of one channel invocation.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct ChannelReport {
    pub channel: Channel,
    /// At least one recipient succeeded.
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Raw error strings, verbatim from the gateway where possible.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<RecipientResult>,
    /// One-line classification of the errors seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ChannelReport {
    /// The channel was not invoked (missing configuration or recipients).
    pub fn skipped(channel: Channel, err: NotifyError) -> Self {
        tracing::info!(channel = %channel, reason = %err, "Channel skipped");
        Self {
            channel,
            success: false,
            sent: 0,
            failed: 0,
            failure: Some(err.failure_kind()),
            errors: vec![err.to_string()],
            recipients: Vec::new(),
            diagnostics: None,
            suggestions: Vec::new(),
        }
    }

    /// Aggregates per-recipient outcomes. Zero successes is a total failure,
    /// a mix is a partial delivery.
    pub fn from_recipients(channel: Channel, recipients: Vec<RecipientResult>) -> Self {
        let sent = recipients.iter().filter(|r| r.is_success()).count();
        let failed = recipients.len() - sent;
        let failure = match (sent, failed) {
            (_, 0) => None,
            (0, _) => Some(FailureKind::TotalChannelFailure),
            _ => Some(FailureKind::PartialDelivery),
        };
        let errors = recipients.iter().filter_map(|r| r.error.clone()).collect();
        Self {
            channel,
            success: sent > 0,
            sent,
            failed,
            failure,
            errors,
            recipients,
            diagnostics: None,
            suggestions: Vec::new(),
        }
    }

    /// A single gateway call for all recipients failed.
    pub fn provider_failure(channel: Channel, recipients: &[String], err: NotifyError) -> Self {
        let msg = err.to_string();
        let mut report = Self::from_recipients(
            channel,
            recipients
                .iter()
                .map(|r| RecipientResult::failed(r, msg.clone()))
                .collect(),
        );
        report.failure = Some(err.failure_kind());
        report.errors = vec![msg];
        report
    }

    /// Whether a gateway was actually invoked.
    pub fn attempted(&self) -> bool {
        !self.failure.is_some_and(|k| k.is_skip())
    }
}
