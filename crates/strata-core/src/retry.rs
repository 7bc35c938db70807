//! Bounded exponential backoff for retryable remote failures.

use crate::error::{Result, StrataError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling on any single backoff delay, bounding worst-case latency.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Exponential delay for a 0-indexed attempt, capped at `max_delay`,
    /// plus jitter of up to half the delay so concurrent tasks hitting the
    /// same rate limit don't retry in lockstep.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter_cap = exp.as_millis() as u64 / 2;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        (exp + Duration::from_millis(jitter)).min(self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// with_retry
// ---------------------------------------------------------------------------

/// Run `operation`, retrying retryable failures up to `config.max_attempts`
/// with exponential backoff.
///
/// Non-retryable errors return immediately. Exhausting the attempt budget
/// returns [`StrataError::RetryExhausted`], distinguishable from a fatal
/// failure so callers can log "throttled repeatedly" vs "rejected".
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last: Option<StrataError> = None;

    for attempt in 0..config.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt + 1 < config.max_attempts {
                    let delay = config.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                last = Some(e);
            }
        }
    }

    Err(StrataError::RetryExhausted {
        attempts: config.max_attempts,
        last: last
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".into()),
    })
}
