use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// How many times to try an operation and how long to wait in between.
///
/// The wait before attempt `n + 1` is `initial_delay_ms * multiplier^(n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: initial_delay.as_millis() as u64,
            multiplier: default_multiplier(),
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Total attempts; zero is treated as a single attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.initial_delay_ms as f64 * factor;
        Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
    }
}

/// Timed suspension used between attempts, injectable so tests need no real clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why [`retry_with_backoff`] gave up.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    /// An attempt failed with an error that is not worth retrying.
    #[error(transparent)]
    Fatal(E),
}

/// Run `op` until it succeeds, fails fatally, or the policy runs out of attempts.
///
/// `op` receives the 1-based attempt number. Errors for which `is_transient`
/// returns false end the loop immediately without sleeping.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    is_transient: C,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Succeeded on attempt {}/{}", attempt, attempts);
                }
                return Ok(value);
            }
            Err(err) if !is_transient(&err) => return Err(RetryError::Fatal(err)),
            Err(err) if attempt >= attempts => {
                warn!("Attempt {}/{} failed, giving up: {}", attempt, attempts, err);
                return Err(RetryError::Exhausted { attempts: attempt, last: err });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} failed, retrying in {}ms: {}",
                    attempt,
                    attempts,
                    delay.as_millis(),
                    err
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records requested delays and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn delays(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}
