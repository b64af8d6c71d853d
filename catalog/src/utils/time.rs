use rand::Rng;
use std::time::Duration;

/// Sleeps for `base_ms` plus a random extra of up to `jitter_ms`.
pub async fn sleep_with_jitter(base_ms: u64, jitter_ms: u64) {
    let extra = if jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=jitter_ms)
    };
    tokio::time::sleep(Duration::from_millis(base_ms + extra)).await;
}

/// Current time as unix seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
