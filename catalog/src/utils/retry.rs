use crate::utils::time::sleep_with_jitter;
use std::future::Future;
use tracing::warn;

const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Retries `operation` on transient failures, doubling the delay each time
/// up to 30 seconds.
/// Permanent errors (bad request, malformed payload) are returned at once.
pub async fn retry_with_backoff<T, F, Fut>(
    mut retries: u32,
    base_delay_ms: u64,
    operation: F,
) -> common::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = common::Result<T>>,
{
    let mut delay = base_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_transient() {
                    return Err(e);
                }
                if retries == 0 {
                    warn!(error = %e, "Giving up after retries");
                    return Err(common::Error::MaxRetriesExceeded);
                }

                warn!(error = %e, delay_ms = delay, retries_left = retries, "Retrying request");
                retries -= 1;
                sleep_with_jitter(delay, delay / 2).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
            }
        }
    }
}
