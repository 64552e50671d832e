use std::future::Future;
use std::time::Duration;

use dispatch_core::{traits::RetryRecorder, DispatchError, DispatchResult, ShutdownSignal};
use tracing::debug;

/// Bounded exponential backoff for upstream calls.
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by a
/// sleep of `base_delay * 2^(n-1)`. Non-retryable errors and the last
/// attempt's error are returned as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Backoff before the attempt that follows attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Whether another attempt should follow a failed attempt `attempt`.
    pub fn should_retry(&self, attempt: u32, error: &DispatchError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Drive `call` until it succeeds, fails permanently, runs out of
    /// attempts or `shutdown` fires during a backoff.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        recorder: &dyn RetryRecorder,
        shutdown: &ShutdownSignal,
        mut call: F,
    ) -> DispatchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DispatchResult<T>>,
    {
        let mut attempt = 1;
        loop {
            if shutdown.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.should_retry(attempt, &error) {
                return Err(error);
            }

            recorder.record_retry(operation, attempt, &error);
            let delay = self.delay_for(attempt);
            debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "backing off");

            tokio::select! {
                _ = shutdown.cancelled() => return Err(DispatchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
