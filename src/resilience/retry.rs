//! Retry logic with deterministic exponential backoff for transient failures.
//!
//! Delays follow `min(base_delay * multiplier^(n-1), max_delay)` for the
//! 1-indexed attempt `n`. No jitter is applied, so a given policy always
//! produces the same schedule.

use crate::errors::{ConfigResult, ConfigurationError, NetworkError, NetworkResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of consulting a policy after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again
    Retry(Duration),
    /// Surface the error to the caller now
    GiveUp,
}

/// Bounded exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RetryPolicy {
    /// Create a validated policy.
    ///
    /// A `base_delay` above `max_delay` is accepted; every delay is then
    /// clamped to `max_delay`.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> ConfigResult<Self> {
        if max_attempts == 0 {
            return Err(ConfigurationError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if base_delay.is_zero() {
            return Err(ConfigurationError::InvalidRetryPolicy(
                "base_delay must be greater than zero".to_string(),
            ));
        }
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ConfigurationError::InvalidRetryPolicy(format!(
                "multiplier must be finite and greater than 1, got {}",
                multiplier
            )));
        }

        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            multiplier,
        })
    }

    /// 3 attempts, 1s base, 30s cap
    pub fn standard() -> Self {
        Self::preset(3, Duration::from_secs(1))
    }

    /// 5 attempts, 0.5s base, 30s cap
    pub fn aggressive() -> Self {
        Self::preset(5, Duration::from_millis(500))
    }

    /// 2 attempts, 2s base, 30s cap
    pub fn conservative() -> Self {
        Self::preset(2, Duration::from_secs(2))
    }

    /// Single attempt, fail fast
    pub fn none() -> Self {
        Self::preset(1, Duration::from_secs(1))
    }

    fn preset(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on any single delay
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Backoff growth factor
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Calculate the delay after the given 1-indexed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(secs)
    }

    /// Whether another attempt is allowed after `attempt` failed with `error`
    pub fn should_retry(&self, error: &NetworkError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Decide what to do after `attempt` failed with `error`
    pub fn decide(&self, error: &NetworkError, attempt: u32) -> RetryDecision {
        if self.should_retry(error, attempt) {
            RetryDecision::Retry(self.delay_for_attempt(attempt))
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Execute an operation with retry logic.
    ///
    /// Attempts run strictly one after another. The backoff sleep is a
    /// plain tokio timer, so dropping the returned future cancels any
    /// pending wait without producing an error.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> NetworkResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = NetworkResult<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => match self.decide(&error, attempt) {
                    RetryDecision::Retry(delay) => {
                        debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Retrying after transient error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp => {
                        warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            retryable = error.is_retryable(),
                            error_code = error.error_code(),
                            "Operation failed permanently"
                        );
                        return Err(error);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use test_case::test_case;

    fn policy(base_secs: f64, max_secs: u64, attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            attempts,
            Duration::from_secs_f64(base_secs),
            Duration::from_secs(max_secs),
            2.0,
        )
        .unwrap()
    }

    #[test_case(1, 1; "first attempt")]
    #[test_case(2, 2; "second attempt")]
    #[test_case(3, 4; "third attempt")]
    #[test_case(4, 8; "fourth attempt")]
    #[test_case(5, 16; "fifth attempt")]
    #[test_case(6, 30; "capped at max")]
    #[test_case(64, 30; "huge exponent stays capped")]
    fn test_delay_calculation(attempt: u32, expected_secs: u64) {
        let policy = policy(1.0, 30, 10);
        assert_eq!(
            policy.delay_for_attempt(attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[test]
    fn test_base_above_max_is_clamped() {
        let policy = policy(10.0, 5, 3);
        for attempt in 1..=4 {
            assert_eq!(policy.delay_for_attempt(attempt), Duration::from_secs(5));
        }
    }

    #[test]
    fn test_presets() {
        let standard = RetryPolicy::standard();
        assert_eq!(standard.max_attempts(), 3);
        assert_eq!(standard.base_delay(), Duration::from_secs(1));
        assert_eq!(standard.max_delay(), Duration::from_secs(30));
        assert_eq!(standard.multiplier(), 2.0);

        assert_eq!(RetryPolicy::aggressive().max_attempts(), 5);
        assert_eq!(
            RetryPolicy::aggressive().base_delay(),
            Duration::from_millis(500)
        );
        assert_eq!(RetryPolicy::conservative().max_attempts(), 2);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }

    #[test]
    fn test_invalid_policies_rejected() {
        let one = Duration::from_secs(1);
        assert!(RetryPolicy::new(0, one, one, 2.0).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, one, 2.0).is_err());
        assert!(RetryPolicy::new(3, one, one, 1.0).is_err());
        assert!(RetryPolicy::new(3, one, one, f64::NAN).is_err());
    }

    #[test]
    fn test_decide_respects_budget_and_kind() {
        let policy = RetryPolicy::standard();
        let unavailable = NetworkError::ServerError { code: 503 };

        assert_eq!(
            policy.decide(&unavailable, 1),
            RetryDecision::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            policy.decide(&unavailable, 2),
            RetryDecision::Retry(Duration::from_secs(2))
        );
        assert_eq!(policy.decide(&unavailable, 3), RetryDecision::GiveUp);
        assert_eq!(
            policy.decide(&NetworkError::ServerError { code: 404 }, 1),
            RetryDecision::GiveUp
        );
        assert_eq!(
            policy.decide(&NetworkError::Unknown, 1),
            RetryDecision::Retry(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let policy = RetryPolicy::none();
        for error in NetworkError::ALL {
            assert!(!policy.should_retry(&error, 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = RetryPolicy::standard()
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(NetworkError::Timeout)
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let started = tokio::time::Instant::now();

        let result: NetworkResult<()> = RetryPolicy::standard()
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(NetworkError::Timeout)
                    } else {
                        Err(NetworkError::ServerError { code: 503 })
                    }
                }
            })
            .await;

        assert_eq!(result, Err(NetworkError::ServerError { code: 503 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_propagates_without_sleeping() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let started = tokio::time::Instant::now();

        let result: NetworkResult<()> = RetryPolicy::aggressive()
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(NetworkError::DecodingFailed)
                }
            })
            .await;

        assert_eq!(result, Err(NetworkError::DecodingFailed));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleep_is_cancellable() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let policy = RetryPolicy::new(
            5,
            Duration::from_secs(60),
            Duration::from_secs(60),
            2.0,
        )
        .unwrap();

        let pending = policy.execute(|| {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NetworkError::NoConnection)
            }
        });

        let outcome = tokio::time::timeout(Duration::from_secs(1), pending).await;

        assert!(outcome.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
