use super::ServiceError;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `unit` until it succeeds, fails for a non-conflict reason, or
/// `attempts` runs have all lost a race.
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    op: &'static str,
    attempts: u32,
    mut unit: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut backoff = ExponentialBackoff {
        current_interval: Duration::from_millis(5),
        initial_interval: Duration::from_millis(5),
        max_interval: Duration::from_millis(200),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempt = 1;
    loop {
        match unit().await {
            Err(err) if err.is_retryable() => {
                if attempt >= attempts {
                    warn!(op, attempt, error = %err, "Giving up after repeated write conflicts");
                    return Err(ServiceError::Conflict(op.to_string()));
                }
                warn!(op, attempt, error = %err, "Write conflict, retrying");
                let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
