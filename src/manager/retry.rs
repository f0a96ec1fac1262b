//! Retry configuration and logic.
//!
//! AWS Config enforces an account-wide request rate, and throttled calls
//! are expected during a scan. The paginated scanner therefore repeats a
//! transient failure until the call succeeds; other failures end the scan. By default there is no attempt cap; the
//! delay between attempts grows exponentially up to `max_delay`, and the
//! scan's cancellation flag is checked before every attempt.

use crate::core::error::ScanError;
use crate::core::types::CancellationFlag;

use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, or `None` to retry forever.
    pub max_attempts: Option<u32>,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries forever with no delay between attempts.
    pub fn immediate() -> Self {
        Self {
            max_attempts: None,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: Some(1),
            ..Self::default()
        }
    }

    /// Sets the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Removes the attempt cap.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        // Clamp the exponent so long outages don't overflow to infinity.
        let exponent = (attempt - 1).min(32) as i32;
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Simple deterministic jitter based on attempt number
            let jitter_factor = 0.5 + (attempt as f64 * 0.618033988749895) % 0.5;
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Returns whether another attempt should be made after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Runs `operation` until it succeeds, following `config`.
///
/// Only errors for which [`ScanError::is_recoverable`] holds are retried;
/// any other error is returned as soon as it occurs. Returns
/// `ScanError::Cancelled` if `cancellation` is set before an attempt, and
/// `ScanError::RetriesExhausted` if a bounded policy runs out of attempts. `on_retry` is called once per failed attempt
/// that will be repeated.
pub async fn retry_async<F, Fut, T, R>(
    config: &RetryConfig,
    cancellation: &CancellationFlag,
    operation_name: &str,
    mut on_retry: R,
    mut operation: F,
) -> Result<T, ScanError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ScanError>>,
    R: FnMut(&ScanError),
{
    let mut attempt = 0;
    loop {
        if cancellation.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_recoverable() => return Err(e),
            Err(e) => {
                attempt += 1;
                if !config.should_retry(attempt) {
                    return Err(ScanError::RetriesExhausted {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                tracing::warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    max_attempts = ?config.max_attempts,
                    error = %e,
                    "API request failed, retrying"
                );
                on_retry(&e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_config_is_unbounded() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, None);
        assert!(config.should_retry(u32::MAX - 1));
        assert!(config.jitter);
    }

    #[test]
    fn test_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, Some(1));
        assert!(!config.should_retry(1));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0)
            .with_jitter(false);

        // 1 * 10 = 10, but capped at 5
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(10_000), Duration::from_secs(5));
    }

    #[test]
    fn test_immediate_has_no_delay() {
        let config = RetryConfig::immediate();
        assert_eq!(config.delay_for_attempt(5), Duration::ZERO);
        assert!(config.should_retry(1_000));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result = retry_async(
            &RetryConfig::immediate(),
            &CancellationFlag::new(),
            "ListDiscoveredResources",
            |_| retries += 1,
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 4 {
                    Err(ScanError::transient("aws", "ListDiscoveredResources", "Rate exceeded"))
                } else {
                    Ok(42)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(retries, 4);
    }

    #[tokio::test]
    async fn test_bounded_retry_exhausts() {
        let config = RetryConfig::immediate().with_max_attempts(3);

        let result: Result<(), _> = retry_async(
            &config,
            &CancellationFlag::new(),
            "BatchGetResourceConfig",
            |_| {},
            || async { Err(ScanError::transient("aws", "BatchGetResourceConfig", "down")) },
        )
        .await;

        match result {
            Err(ScanError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_async(
            &RetryConfig::immediate(),
            &CancellationFlag::new(),
            "ListDiscoveredResources",
            |_| panic!("fatal errors must not be retried"),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::fatal("aws", "ListDiscoveredResources", "AccessDenied (403)"))
            },
        )
        .await;

        assert!(matches!(result, Err(ScanError::FatalApi { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retrying() {
        let flag = CancellationFlag::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_async(
            &RetryConfig::immediate(),
            &flag,
            "ListDiscoveredResources",
            |_| flag.cancel(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::transient("aws", "ListDiscoveredResources", "Rate exceeded"))
            },
        )
        .await;

        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
