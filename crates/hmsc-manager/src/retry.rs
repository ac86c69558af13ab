use std::time::Duration;

use crate::capability::Network;

/// Backoff delays between submission attempts: 1s, then 2s, then 4s, for a
/// total of 3 attempts.
const BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];
const MAX_ATTEMPTS: usize = 3;

/// Submits `frozen_bytes` through `network`, retrying transient failures up
/// to [`MAX_ATTEMPTS`] times with exponential backoff. Returns the last
/// error if every attempt fails.
pub async fn submit_with_retry(network: &dyn Network, frozen_bytes: &[u8]) -> anyhow::Result<String> {
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        match network.submit(frozen_bytes).await {
            Ok(receipt) => return Ok(receipt),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "transaction submission failed");
                last_err = Some(err);
                if let Some(delay) = BACKOFF.get(attempt) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
