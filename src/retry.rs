//! Bounded retry with exponential backoff and jitter
//!
//! Applied only to idempotent upstream calls (embedding, search).
//! Generation calls must not go through this helper.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `op` until it succeeds, a permanent error occurs, or
/// `policy.max_attempts` attempts are exhausted. Only errors classified
/// transient by [`Error::is_transient`] are retried.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryConfig, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = backoff_delay(policy, attempt);
                warn!(
                    "{} attempt {}/{} failed ({}), retrying in {:?}",
                    what, attempt, attempts, err, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("retry loop always returns from its last attempt")
}

/// Exponential delay for the given 1-based attempt, capped at
/// `max_delay_ms`, with up to 25% added jitter.
fn backoff_delay(policy: &RetryConfig, attempt: usize) -> Duration {
    let exp = 1u64 << (attempt.min(16) - 1) as u32;
    let base = policy.base_delay_ms.saturating_mul(exp).min(policy.max_delay_ms);
    let jitter = rand::thread_rng().gen_range(0..=base / 4 + 1);
    Duration::from_millis(base.saturating_add(jitter).min(policy.max_delay_ms))
}
