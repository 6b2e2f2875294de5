//! Backoff for throttled or unavailable S3 calls.

use lb_error::StorageError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How often and how patiently a list or head call is repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry, doubled for each further one
    pub base_delay: Duration,

    /// Cap for a single delay, before jitter
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Wait before retry number `retry` (zero-based), with up to 25% jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        let capped = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max_delay);

        let spread = u64::try_from(capped.as_millis() / 4).unwrap_or(u64::MAX);
        capped.saturating_add(Duration::from_millis(rand::rng().random_range(0..=spread)))
    }
}

/// Run `call`, repeating it while it fails with a transient error and the
/// retry budget lasts.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut retry = 0;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() || retry >= config.max_retries {
            if retry > 0 {
                warn!(operation, attempts = retry + 1, error = %err, "S3 call failed after retries");
            }
            return Err(err);
        }

        let delay = config.delay(retry);
        warn!(
            operation,
            retry,
            delay_ms = delay.as_millis(),
            error = %err,
            "S3 call failed, retrying"
        );
        sleep(delay).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries).with_delays(Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_delay_doubles_up_to_cap() {
        let config =
            RetryConfig::new(5).with_delays(Duration::from_millis(400), Duration::from_secs(2));

        for _ in 0..20 {
            let first = config.delay(0);
            assert!(first >= Duration::from_millis(400));
            assert!(first <= Duration::from_millis(500));

            let second = config.delay(1);
            assert!(second >= Duration::from_millis(800));
            assert!(second <= Duration::from_millis(1000));

            let late = config.delay(40);
            assert!(late >= Duration::from_secs(2));
            assert!(late <= Duration::from_millis(2500));
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&immediate(3), "list", || {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if count < 2 {
                    Err(StorageError::Unavailable("SlowDown".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), StorageError> = with_retry(&immediate(3), "head", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::AccessDenied("AccessDenied".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(StorageError::AccessDenied(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), StorageError> = with_retry(&immediate(2), "list", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(StorageError::Unavailable("timeout".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
