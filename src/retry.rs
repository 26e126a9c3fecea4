//! Retryers and backoff strategies for transient failures.
//!
//! The invocation loop hands every [`RetryableError`] to a [`Retryer`], which
//! either waits and lets the loop try again or propagates the error. Each
//! invocation gets its own retryer from [`Retryer::fresh`], so attempt counts
//! are never shared between concurrent calls.

use crate::error::RetryableError;
use crate::Result;
use async_trait::async_trait;
use rand::Rng;
use std::time::{Duration, SystemTime};

/// Decides whether a retryable failure is attempted again.
///
/// Implementations must eventually propagate for any realistic stream of
/// failures: the invocation loop has no bound of its own.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use declient::{Result, RetryableError, Retryer};
///
/// /// Retries immediately, up to a fixed number of times.
/// struct Immediate {
///     left: usize,
///     max: usize,
/// }
///
/// #[async_trait]
/// impl Retryer for Immediate {
///     async fn continue_or_propagate(&mut self, error: RetryableError) -> Result<()> {
///         if self.left == 0 {
///             return Err(error.into());
///         }
///         self.left -= 1;
///         Ok(())
///     }
///
///     fn fresh(&self) -> Box<dyn Retryer> {
///         Box::new(Immediate { left: self.max, max: self.max })
///     }
/// }
/// ```
#[async_trait]
pub trait Retryer: Send + Sync {
    /// Returns `Ok(())` to attempt the call again, possibly after sleeping,
    /// or `Err` (usually the same error) to stop retrying.
    async fn continue_or_propagate(&mut self, error: RetryableError) -> Result<()>;

    /// Returns a retryer with the same policy and no recorded attempts.
    fn fresh(&self) -> Box<dyn Retryer>;
}

/// A retryer that never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

#[async_trait]
impl Retryer for NeverRetry {
    async fn continue_or_propagate(&mut self, error: RetryableError) -> Result<()> {
        Err(error.into())
    }

    fn fresh(&self) -> Box<dyn Retryer> {
        Box::new(NeverRetry)
    }
}

/// A retryer that sleeps according to a [`RetryStrategy`].
///
/// A `retry_after` hint on the error takes precedence over the strategy's
/// delay, capped by [`max_retry_after`](Self::max_retry_after). Once the
/// strategy is exhausted the last error is propagated.
///
/// # Examples
///
/// ```
/// use declient::{BackoffRetryer, RetryStrategy};
/// use std::time::Duration;
///
/// let retryer = BackoffRetryer::new(RetryStrategy::Linear {
///     delay: Duration::from_millis(250),
///     max_retries: 2,
/// })
/// .max_retry_after(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffRetryer {
    strategy: RetryStrategy,
    max_retry_after: Duration,
    attempt: usize,
}

impl BackoffRetryer {
    /// Creates a retryer following `strategy`.
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            max_retry_after: Duration::from_secs(300), // 5 minutes
            attempt: 0,
        }
    }

    /// Caps how long a server-provided retry hint may delay the next attempt.
    pub fn max_retry_after(mut self, max_wait: Duration) -> Self {
        self.max_retry_after = max_wait;
        self
    }

    fn hinted_delay(&self, retry_after: SystemTime) -> Duration {
        retry_after
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
            .min(self.max_retry_after)
    }
}

impl Default for BackoffRetryer {
    fn default() -> Self {
        Self::new(RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_retries: 4,
            jitter: false,
        })
    }
}

#[async_trait]
impl Retryer for BackoffRetryer {
    async fn continue_or_propagate(&mut self, error: RetryableError) -> Result<()> {
        let attempt = self.attempt + 1;
        let Some(backoff) = self.strategy.delay_for_attempt(attempt) else {
            tracing::debug!(attempt = attempt, "Retries exhausted");
            return Err(error.into());
        };
        self.attempt = attempt;

        let delay = match error.retry_after() {
            Some(retry_after) => {
                let delay = self.hinted_delay(retry_after);
                tracing::info!(
                    delay_ms = delay.as_millis(),
                    attempt = attempt,
                    max_wait_secs = self.max_retry_after.as_secs(),
                    "Server requested retry - waiting before next attempt"
                );
                delay
            }
            None => {
                tracing::info!(
                    delay_ms = backoff.as_millis(),
                    attempt = attempt,
                    "Retrying request after delay"
                );
                backoff
            }
        };

        tokio::time::sleep(delay).await;
        Ok(())
    }

    fn fresh(&self) -> Box<dyn Retryer> {
        Box::new(Self {
            attempt: 0,
            ..self.clone()
        })
    }
}

/// Defines the delays between retries.
///
/// # Examples
///
/// ```
/// use declient::RetryStrategy;
/// use std::time::Duration;
///
/// // No retries
/// let no_retry = RetryStrategy::None;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Do not retry failed requests.
    #[default]
    None,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(attempt - 1)` (capped at `max_delay`).
    /// Optional jitter adds randomness to prevent thundering herd.
    ExponentialBackoff {
        /// The initial delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to add random jitter to delays.
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Custom retry logic.
    ///
    /// The function takes the retry number (starting from 1) and returns
    /// `Some(delay)` to retry after the delay, or `None` to stop.
    Custom {
        /// Function that determines retry delay.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// Returns the delay before the given retry, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }

                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    // between 50% and 100% of the delay
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                if attempt > *max_retries {
                    None
                } else {
                    Some(*delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }
}
