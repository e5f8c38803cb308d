//! Bounded retry with exponential backoff for fallible async operations.
//!
//! The wrapper is agnostic to idempotency: callers must only wrap operations
//! that are safe to re-execute.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Retry policy applied explicitly at call sites that need one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Each subsequent delay is multiplied by this factor.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidInput(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        if backoff_multiplier <= 0.0 {
            return Err(Error::InvalidInput(
                "backoff multiplier must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
        })
    }

    /// Delay inserted after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.initial_delay
            .mul_f64(self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32))
    }
}

/// Invoke `op` under `policy`, retrying failures for which `is_retryable`
/// returns true.
///
/// Success returns immediately. A non-retryable error propagates untouched.
/// Once the attempt budget is exhausted the last error is wrapped in
/// [`Error::OperationFailed`].
pub async fn retry_with_policy<T, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let mut delay = policy.initial_delay;
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) if attempt == policy.max_attempts => {
                tracing::error!(
                    operation,
                    attempts = policy.max_attempts,
                    error = %e,
                    "operation failed; attempt budget exhausted"
                );
                return Err(Error::OperationFailed {
                    operation: operation.to_string(),
                    attempts: policy.max_attempts,
                    source: Box::new(e),
                });
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "operation failed; retrying after delay"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_multiplier);
            }
        }
    }
    unreachable!("retry loop returns within the attempt budget")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> Error {
        Error::Timeout { seconds: 1 }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_secs(1), 2.0).unwrap()
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(RetryPolicy::new(0, Duration::from_secs(1), 2.0).is_err());
    }

    #[test]
    fn backoff_growth() {
        let p = policy(3);
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let out = retry_with_policy(&policy(3), "op", Error::is_transient, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(7u32)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_propagates_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = retry_with_policy::<u32, _, _, _>(
            &policy(3),
            "op",
            Error::is_transient,
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::RefinementFailed { exit_code: 2 })
                }
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::RefinementFailed { exit_code: 2 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_wraps_last_error() {
        let err = retry_with_policy::<u32, _, _, _>(
            &policy(2),
            "flaky",
            Error::is_transient,
            || async { Err(transient()) },
        )
        .await
        .unwrap_err();
        match err {
            Error::OperationFailed {
                operation,
                attempts,
                ..
            } => {
                assert_eq!(operation, "flaky");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
