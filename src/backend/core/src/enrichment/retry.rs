//! Bounded retry with backoff for transient flow-service failures.

use std::future::Future;
use std::time::Duration;

use crate::error::{BoardError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// Backoff
// ═══════════════════════════════════════════════════════════════════════════════

/// Strategy for calculating retry delays.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries
    Fixed { delay: Duration },
    /// `initial + increment * attempt`
    Linear { initial: Duration, increment: Duration },
    /// `initial * multiplier^attempt`, capped at `max`
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// No delay at all. Handy in tests.
    pub fn none() -> Self {
        Self::Fixed { delay: Duration::ZERO }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Linear { initial, increment } => initial.saturating_add(increment.saturating_mul(attempt)),
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let scaled = initial.as_nanos() as f64 * multiplier.powi(attempt as i32);
                let capped = scaled.min(max.as_nanos() as f64).max(0.0);
                Duration::from_nanos(capped as u64)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Retry Policy
// ═══════════════════════════════════════════════════════════════════════════════

/// How many times, and how patiently, a failed call is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::none(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a failure on attempt `attempt` (1-indexed) earns another try.
    pub fn should_retry(&self, attempt: u32, error: &BoardError) -> bool {
        attempt < self.max_attempts() && error.is_retryable()
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// The returned error is the last one seen, with the number of attempts
    /// made recorded under the `attempts` context key.
    pub async fn run<F, Fut, T>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, &err) => {
                    let delay = self.backoff.delay_for_attempt(attempt - 1);
                    tracing::debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.with_context("attempts", attempt)),
            }
        }
    }
}

/// Attempts recorded on an error returned by [`RetryPolicy::run`].
pub fn attempts_made(error: &BoardError) -> u32 {
    error
        .details()
        .context
        .get("attempts")
        .and_then(serde_json::Value::as_u64)
        .map_or(0, |n| n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed { delay: Duration::from_millis(10) };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(10));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_millis(10));
    }

    #[test]
    fn test_linear_backoff() {
        let backoff = Backoff::Linear {
            initial: Duration::from_millis(100),
            increment: Duration::from_millis(50),
        };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
    }

    #[test]
    fn test_exponential_backoff_is_capped_and_monotone() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            multiplier: 2.0,
        };

        let delays: Vec<_> = (0..6).map(|n| backoff.delay_for_attempt(n)).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[3], Duration::from_millis(800));
        assert_eq!(delays[5], Duration::from_millis(1000));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        // Large attempt counts stay capped
        assert_eq!(backoff.delay_for_attempt(10_000), Duration::from_millis(1000));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();
        let transient = BoardError::upstream_status(503, "");
        let permanent = BoardError::upstream_status(404, "");

        assert!(policy.should_retry(1, &transient));
        assert!(policy.should_retry(3, &transient));
        assert!(!policy.should_retry(4, &transient));
        assert!(!policy.should_retry(1, &permanent));
    }

    #[tokio::test]
    async fn test_run_stops_after_max_attempts() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Backoff::none(),
        };
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = policy
            .run("always-503", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BoardError::upstream_status(503, "down"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.code(), ErrorCode::UpstreamUnavailable);
        assert_eq!(attempts_made(&err), 4);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Backoff::none(),
        };
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = policy
            .run("not-found", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BoardError::upstream_status(404, "missing"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(attempts_made(&err), 1);
    }

    #[tokio::test]
    async fn test_run_recovers_after_transient_failure() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Backoff::none(),
        };
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value = policy
            .run("flaky", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(BoardError::upstream_status(502, ""))
                } else {
                    Ok("ok")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_between_attempts() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();

        let _ = policy
            .run("slow", || async { Err::<(), _>(BoardError::upstream_status(503, "")) })
            .await;

        // 500ms + 1000ms + 1000ms
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
    }
}
