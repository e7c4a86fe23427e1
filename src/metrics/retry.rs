//! Retry policy for backend calls: linear backoff, 502 only.

use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay before retry `n` (1-based) is `base_delay * n`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        (1..=self.max_retries as u32).map(move |n| base * n)
    }

    /// Run `op`, retrying only while it fails with a bad gateway.
    pub async fn run<F, Fut, T>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        RetryIf::spawn(self.delays(), op, |err: &ApiError| {
            let retry = err.is_bad_gateway();
            if retry {
                debug!("Retrying after {}", err);
            }
            retry
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bad_gateway() -> ApiError {
        ApiError::Status { status: 502, path: "token/x/dev".to_string() }
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(1500)
            ]
        );
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(500)).delays().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_bad_gateway_until_exhausted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::default();

        let result: Result<(), ApiError> = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(bad_gateway())
                }
            })
            .await;

        assert_eq!(result, Err(bad_gateway()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_final() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::default();

        let result: Result<(), ApiError> = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::Status { status: 500, path: "token/x/dev".to_string() })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_502() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::default();

        let result = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(bad_gateway())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
