use std::future::Future;
use std::time::Duration;

use pullbridge_core::{AppError, AppResult};
use rand::Rng;
use tracing::warn;

/// Exponential backoff with additive jitter for transient failures.
///
/// The wait before retry `n` (1-based) is
/// `min(max_wait, initial_wait * exp_base^(n - 1) + jitter)` where `jitter` is
/// drawn uniformly from `[0, max_jitter]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    initial_wait: Duration,
    max_jitter: Duration,
    max_wait: Duration,
    exp_base: f64,
    max_attempts: Option<u32>,
    retry_on: fn(&AppError) -> bool,
}

impl RetryPolicy {
    /// Creates an unbounded policy retrying transport errors.
    #[must_use]
    pub fn new(initial_wait: Duration, max_jitter: Duration, max_wait: Duration) -> Self {
        Self {
            initial_wait,
            max_jitter,
            max_wait,
            exp_base: 2.0,
            max_attempts: None,
            retry_on: AppError::is_transport,
        }
    }

    /// Policy used around provider data pulls: 1 s initial, 5 s jitter, 32 s cap, no attempt limit.
    #[must_use]
    pub fn data_pull() -> Self {
        Self::new(
            Duration::from_secs(1),
            Duration::from_secs(5),
            Duration::from_secs(32),
        )
    }

    /// Policy used around telemetry publishing: 0.1 s initial, 1 s jitter, 5 s cap, 5 attempts.
    #[must_use]
    pub fn event_publish() -> Self {
        Self::new(
            Duration::from_millis(100),
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
        .with_max_attempts(5)
    }

    /// Limits the total number of attempts, first call included.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Replaces the predicate deciding which errors are retried.
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: fn(&AppError) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Returns the attempt limit, if any.
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns whether `error` raised by attempt `attempt` should be retried.
    #[must_use]
    pub fn should_retry(&self, error: &AppError, attempt: u32) -> bool {
        (self.retry_on)(error) && self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Computes the wait after failed attempt `attempt` for a jitter sample in `[0, 1]`.
    #[must_use]
    pub fn backoff(&self, attempt: u32, jitter_sample: f64) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let exponential = self.initial_wait.as_secs_f64() * self.exp_base.powi(exponent);
        let jitter = self.max_jitter.as_secs_f64() * jitter_sample.clamp(0.0, 1.0);
        let wait = (exponential + jitter).min(self.max_wait.as_secs_f64());

        Duration::try_from_secs_f64(wait).unwrap_or(self.max_wait)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error or
    /// exhausts the attempt limit. The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0_u32;

        loop {
            attempt = attempt.saturating_add(1);

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let wait = self.backoff(attempt, jitter_sample());
                    warn!(
                        operation = operation_name,
                        attempt,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn jitter_sample() -> f64 {
    rand::thread_rng().gen_range(0.0..=1.0)
}
