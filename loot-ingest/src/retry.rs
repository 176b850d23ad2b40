//! Bounded retry with exponential backoff and full jitter.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Upper bound of the sleep before retry number `attempt` (1-based).
    pub fn backoff_cap(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Jittered sleep in `[0, backoff_cap(attempt)]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let cap = self.backoff_cap(attempt).as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=cap))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ExtractError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    let delay = self.backoff(attempt);
                    warn!(
                        target: "loot::retry",
                        request = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let p = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(p.backoff_cap(1), Duration::from_millis(100));
        assert_eq!(p.backoff_cap(2), Duration::from_millis(200));
        assert_eq!(p.backoff_cap(3), Duration::from_millis(350));
        assert_eq!(p.backoff_cap(40), Duration::from_millis(350));
        for attempt in 1..5 {
            assert!(p.backoff(attempt) <= p.backoff_cap(attempt));
        }
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = fast(3)
            .run("submit", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ExtractError::Status { status: 503, body: String::new() })
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(out.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = fast(2)
            .run("submit", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExtractError::Status { status: 429, body: String::new() })
            })
            .await;
        assert!(out.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out: Result<(), _> = fast(5)
            .run("submit", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExtractError::Status { status: 401, body: String::new() })
            })
            .await;
        assert!(out.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
