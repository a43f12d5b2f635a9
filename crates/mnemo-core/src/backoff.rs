//! Deterministic exponential backoff with jitter.
//!
//! The exponential growth and the 30s clamp are driven by `backoff::ExponentialBackoff`,
//! the same type the teacher's `RetryHandler` wraps in `services/google_ai/retry.rs`.
//! The spec pins an exact uniform jitter band on top of that growth, which doesn't
//! match the crate's own randomization model, so the crate's randomization is
//! disabled (`randomization_factor: 0.0`) and this module layers its own jitter
//! band afterward. The retry *loop* shape (attempt counter, non-retryable
//! short-circuit, structured logging on each retry) mirrors `RetryHandler::retry`.

use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};
use rand::Rng;

use crate::error::{MemoryError, Result};

const MAX_DELAY: Duration = Duration::from_secs(30);
const MAX_ATTEMPT: i64 = 30;

/// Computes the backoff delay for a given (1-indexed) attempt number.
///
/// `attempt <= 0` always yields zero delay (no wait before the first try).
/// Attempts above 30 are clamped to 30 to keep `2^attempt` from overflowing.
pub fn delay_for_attempt(attempt: i64, base: Duration) -> Duration {
    if attempt <= 0 {
        return Duration::ZERO;
    }

    let clamped = attempt.min(MAX_ATTEMPT);
    let unjittered = unjittered_delay(clamped, base);

    let jitter_band = unjittered.as_secs_f64() / 4.0;
    let jitter = if jitter_band > 0.0 {
        rand::thread_rng().gen_range(-jitter_band..jitter_band)
    } else {
        0.0
    };

    Duration::from_secs_f64((unjittered.as_secs_f64() + jitter).max(0.0))
}

/// Drives a fresh, non-randomized `ExponentialBackoff` through `attempt` steps to
/// compute `min(30s, 2^attempt * base)` — the growth and the clamp come from the
/// crate rather than a hand-rolled `2f64.powi`.
fn unjittered_delay(attempt: i64, base: Duration) -> Duration {
    let mut backoff = ExponentialBackoff {
        initial_interval: base.mul_f64(2.0).min(MAX_DELAY),
        max_interval: MAX_DELAY,
        multiplier: 2.0,
        randomization_factor: 0.0,
        max_elapsed_time: None,
        ..Default::default()
    };
    backoff.reset();

    let mut delay = backoff.initial_interval;
    for _ in 0..attempt {
        delay = backoff.next_backoff().unwrap_or(MAX_DELAY);
    }
    delay.min(MAX_DELAY)
}

/// Configuration for a retry loop built on [`delay_for_attempt`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

/// Runs `operation` until it succeeds, a non-retryable error is produced, or
/// `config.max_attempts` attempts have been made. Sleeps between attempts
/// using [`delay_for_attempt`].
pub async fn retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt: i64 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                let exhausted = attempt as u32 >= config.max_attempts;
                if !err.is_retryable() || exhausted {
                    return Err(err);
                }

                let delay = delay_for_attempt(attempt, config.base_delay);
                tracing::warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    ?delay,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Parses a JSON string, mapping a parse failure to a retryable error.
pub fn parse_retryable_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(MemoryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_zero_is_zero_delay() {
        assert_eq!(delay_for_attempt(0, Duration::from_millis(500)), Duration::ZERO);
    }

    #[test]
    fn negative_attempt_is_zero_delay() {
        assert_eq!(delay_for_attempt(-5, Duration::from_millis(500)), Duration::ZERO);
    }

    #[test]
    fn delay_is_bounded_by_thirty_seconds_plus_jitter_band() {
        // The clamp is 30s, but the jitter band on top of a clamped delay can add
        // up to 30s/4 = 7.5s (§5's `± jitter` is applied after the `min(30s, ...)`).
        let max_with_jitter = Duration::from_secs(30) + Duration::from_millis(7_500);
        for attempt in 1..=40 {
            let delay = delay_for_attempt(attempt, Duration::from_secs(1));
            assert!(delay <= max_with_jitter + Duration::from_millis(1));
        }
    }

    #[test]
    fn delay_grows_within_jitter_band_of_doubling() {
        let base = Duration::from_millis(100);
        for attempt in 1..=5 {
            let unjittered = base.mul_f64(2f64.powi(attempt as i32)).min(Duration::from_secs(30));
            let band = unjittered.as_secs_f64() / 4.0;
            for _ in 0..50 {
                let delay = delay_for_attempt(attempt, base).as_secs_f64();
                assert!(delay >= (unjittered.as_secs_f64() - band).max(0.0) - 1e-9);
                assert!(delay <= unjittered.as_secs_f64() + band + 1e-9);
            }
        }
    }

    #[test]
    fn large_attempt_does_not_panic() {
        let _ = delay_for_attempt(i64::MAX - 1, Duration::from_secs(1));
        let _ = delay_for_attempt(1000, Duration::from_millis(10));
    }
}
