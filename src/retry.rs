// ABOUTME: Bounded retry with exponential backoff and jitter for fallible async operations
// ABOUTME: Pure wrapper function, no decorator machinery; terminal errors propagate immediately

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::capability::CapabilityError;

/// Errors that implement this can tell the retry wrapper whether another
/// attempt is worthwhile.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CapabilityError {
    fn is_retryable(&self) -> bool {
        CapabilityError::is_retryable(self)
    }
}

/// Backoff policy: delay before attempt N+1 is
/// `min(max_delay, base_delay * multiplier^(N-1))`, randomized by
/// ± `jitter_fraction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let raw = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = raw.min(self.max_delay.as_millis() as f64);

        let jittered = if self.jitter_fraction > 0.0 {
            let range = capped * self.jitter_fraction;
            let offset = rand::random::<f64>() * range * 2.0 - range;
            (capped + offset).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(jittered as u64)
    }
}

#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The error was not worth retrying; propagated on first occurrence.
    #[error("operation failed with terminal error: {source}")]
    Terminal {
        #[source]
        source: E,
    },

    /// Every attempt failed with a retryable error.
    #[error("operation failed after {attempts} attempts over {elapsed:?}: {source}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    pub fn into_source(self) -> E {
        match self {
            RetryError::Terminal { source } => source,
            RetryError::Exhausted { source, .. } => source,
        }
    }

    /// Number of attempts actually made. Terminal errors fail on the first
    /// and only attempt.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Terminal { .. } => 1,
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `operation` until it succeeds, a terminal error occurs, or
/// `policy.max_attempts` retryable failures accumulate. Does not log payloads;
/// only attempt counts and delays.
pub async fn with_retry<F, Fut, T, E>(operation: F, policy: &RetryPolicy) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_retryable() {
                    return Err(RetryError::Terminal { source: error });
                }

                last_error = Some(error);

                if attempt < max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    debug!(attempt, ?delay, "retryable failure, backing off");
                    sleep(delay).await;
                }
            }
        }
    }

    let source = last_error.expect("at least one attempt was made");
    Err(RetryError::Exhausted {
        attempts: max_attempts,
        elapsed: started.elapsed(),
        source,
    })
}
