//! Fixed-delay retry shared by every retrying loop.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Delay used by the reference behaviour between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retries forever with a fixed delay between attempts, until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay.
    ///
    /// Returns `false` if the token was cancelled before the delay elapsed.
    pub async fn wait(&self, cancellation_token: &CancellationToken) -> bool {
        select! {
            biased;
            _ = cancellation_token.cancelled() => false,
            _ = tokio::time::sleep(self.delay) => true,
        }
    }

    /// Run `operation` until it succeeds, waiting the delay after each failure.
    ///
    /// Returns `None` if cancelled before a successful attempt.
    pub async fn retry_until_ok<T, E, F, Fut>(
        &self,
        cancellation_token: &CancellationToken,
        operation: &str,
        mut attempt: F,
    ) -> Option<T>
    where
        E: Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            let result = select! {
                biased;
                _ = cancellation_token.cancelled() => return None,
                result = attempt() => result,
            };

            match result {
                Ok(value) => return Some(value),
                Err(e) => {
                    error!(operation, retry_in = ?self.delay, "Attempt failed: {e:?}");
                }
            }

            if !self.wait(cancellation_token).await {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use similar_asserts::assert_eq;
    use test_log::test;
    use tokio::time::Instant;

    use super::*;

    #[test(tokio::test(start_paused = true))]
    async fn retries_until_success() {
        let policy = RetryPolicy::fixed(Duration::from_secs(5));
        let token = CancellationToken::new();
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let started = Instant::now();

        let value = policy
            .retry_until_ok(&token, "test", || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("not yet")
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(value, Some(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[test(tokio::test(start_paused = true))]
    async fn first_success_does_not_wait() {
        let policy = RetryPolicy::default();
        let token = CancellationToken::new();
        let started = Instant::now();

        let value = policy
            .retry_until_ok(&token, "test", || async { Ok::<_, ()>("done") })
            .await;

        assert_eq!(value, Some("done"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test(tokio::test(start_paused = true))]
    async fn cancellation_stops_retrying() {
        let policy = RetryPolicy::fixed(Duration::from_secs(5));
        let token = CancellationToken::new();
        let counter = AtomicUsize::new(0);
        let attempts = &counter;

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(12)).await;
                token.cancel();
            })
        };

        let value: Option<()> = policy
            .retry_until_ok(&token, "test", || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("always")
            })
            .await;

        canceller.await.expect("canceller should finish");
        assert_eq!(value, None);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test(tokio::test(start_paused = true))]
    async fn wait_returns_false_when_cancelled() {
        let policy = RetryPolicy::fixed(Duration::from_secs(5));
        let token = CancellationToken::new();
        token.cancel();

        assert!(!policy.wait(&token).await);
    }
}
