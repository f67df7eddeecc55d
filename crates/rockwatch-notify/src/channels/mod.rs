pub mod email;
pub mod messaging;
pub mod sms;

use crate::error::NotifyError;
use std::future::Future;
use std::time::Duration;

/// Runs one gateway call under `limit`, mapping elapsed time to
/// [`NotifyError::Timeout`].
pub(crate) async fn with_timeout<T, F>(channel: &str, limit: Duration, fut: F) -> crate::error::Result<T>
where
    F: Future<Output = crate::error::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(NotifyError::Timeout {
            channel: channel.to_string(),
            secs: limit.as_secs(),
        }),
    }
}
