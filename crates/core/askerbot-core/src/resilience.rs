//! Deadlines and cancellation for outbound calls

use crate::{AskerError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run `fut` until it completes, the deadline passes, or `cancel` fires
///
/// Cancellation wins over a simultaneous completion so a request that has
/// been abandoned never keeps doing work.
pub async fn with_deadline<F, T>(
    label: &str,
    deadline: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(call = label, "outbound call cancelled");
            Err(AskerError::cancelled(label.to_string()))
        }
        res = tokio::time::timeout(deadline, fut) => match res {
            Ok(inner) => inner,
            Err(_) => {
                warn!(call = label, deadline_ms = deadline.as_millis() as u64, "outbound call timed out");
                Err(AskerError::timeout(format!(
                    "{} exceeded {} ms",
                    label,
                    deadline.as_millis()
                )))
            }
        },
    }
}
