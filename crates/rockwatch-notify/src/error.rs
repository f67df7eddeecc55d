use serde::Serialize;

/// Errors raised by channel adapters and their gateways.
///
/// These never cross the [`Dispatcher`](crate::dispatcher::Dispatcher)
/// boundary: each adapter folds them into a [`ChannelReport`](crate::ChannelReport)
/// carrying a [`FailureKind`].
///
/// # Examples
///
/// ```rust
/// use rockwatch_notify::error::{FailureKind, NotifyError};
///
/// let err = NotifyError::NotConfigured("sms".to_string());
/// assert!(err.to_string().contains("sms"));
/// assert_eq!(err.failure_kind(), FailureKind::ConfigurationMissing);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Gateway credentials are absent.
    #[error("Notify: channel not configured: {0}")]
    NotConfigured(String),

    #[error("Notify: no recipients for {0}")]
    NoRecipients(String),

    /// The gateway reported a failure. The message is kept verbatim.
    #[error("Notify: provider error: {0}")]
    Provider(String),

    #[error("Notify: {channel} call timed out after {secs}s")]
    Timeout { channel: String, secs: u64 },

    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notify: SMTP error: {0}")]
    Smtp(String),

    #[error("Notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    #[error("Notify: {0}")]
    Other(String),
}

impl NotifyError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            NotifyError::NotConfigured(_) | NotifyError::InvalidConfig(_) => {
                FailureKind::ConfigurationMissing
            }
            NotifyError::NoRecipients(_) => FailureKind::NoRecipients,
            _ => FailureKind::ProviderError,
        }
    }
}

/// Classification of a channel outcome that was not a clean success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum FailureKind {
    /// Channel skipped: gateway credentials absent.
    ConfigurationMissing,
    /// Channel skipped: no endpoints for the resolved groups.
    NoRecipients,
    /// Gateway-reported failure on a single-attempt channel.
    ProviderError,
    /// Some recipients succeeded, some failed. Not escalated.
    PartialDelivery,
    /// Zero recipients succeeded.
    TotalChannelFailure,
}

impl FailureKind {
    /// Whether the channel was actually invoked against a gateway.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            FailureKind::ConfigurationMissing | FailureKind::NoRecipients
        )
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
