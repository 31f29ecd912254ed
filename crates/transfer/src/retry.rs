//! Bounded retry with a fixed or multiplicative delay.
//!
//! Cancellation is checked before every attempt and while waiting between
//! attempts. An in-flight attempt is never interrupted.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Outcome of a retried operation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("cancelled")]
    Cancelled,

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of invocations, including the first (at least 1).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub delay: Duration,
    /// Multiplier applied per subsequent failure. `1.0` means fixed delay.
    pub backoff_factor: f64,
    /// Upper bound for the delay when backing off.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Creates a policy with a constant delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff_factor: 1.0,
            max_delay: delay,
        }
    }

    /// Switches to multiplicative backoff capped at `max_delay`.
    pub fn with_backoff(mut self, factor: f64, max_delay: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.backoff_factor <= 1.0 {
            return self.delay;
        }
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64().max(self.delay.as_secs_f64()));
        Duration::from_secs_f64(capped)
    }

    /// Runs `operation` until it succeeds, the attempt budget is spent, or
    /// `cancel` fires.
    ///
    /// `operation` receives the 1-based attempt number. Every failure is
    /// passed to `on_attempt_failure` before the next attempt or the final
    /// [`RetryError::Exhausted`].
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
        mut on_attempt_failure: impl FnMut(&E, u32),
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let budget = self.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            attempt += 1;
            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            on_attempt_failure(&err, attempt);
            if attempt >= budget {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.delay_for_attempt(attempt);
            trace!(attempt, delay_ms = delay.as_millis() as u64, "waiting before retry");
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
