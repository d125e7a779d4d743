// src/services/retry.rs
use crate::errors::RedesignError;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Bounded attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `operation` until it succeeds or attempts run out. The closure
    /// receives the 1-based attempt number. Non-provider errors are returned
    /// immediately; exhaustion yields `RetriesExhausted` with the last message.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RedesignError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RedesignError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(RedesignError::RetriesExhausted {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, self.max_attempts, err, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_one_failure() {
        let calls = AtomicU32::new(0);
        let result = quick(2)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        Err(RedesignError::Provider("cold start".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick(2)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RedesignError::Provider("queue full".into())) }
            })
            .await;

        match result {
            Err(RedesignError::RetriesExhausted { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert_eq!(message, "queue full");
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn configuration_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = quick(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RedesignError::Configuration("HF_API_TOKEN not set".into())) }
            })
            .await;

        assert!(matches!(result, Err(RedesignError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waits_between_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(50));
        let started = std::time::Instant::now();
        let _: Result<(), _> = policy
            .run(|_| async { Err(RedesignError::ProviderTimeout) })
            .await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
