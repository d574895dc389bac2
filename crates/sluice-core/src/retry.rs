//! Retry policy and reconnect backoff: decide how long to wait.

use std::time::Duration;

/// Retry policy for failed task attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per task, including the first one.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single delay. `None` lets it grow without limit.
    pub max_delay: Option<Duration>,
}

impl RetryPolicy {
    /// 3 attempts, 5s seed, doubling, capped at 60s.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Some(Duration::from_secs(60)),
        }
    }

    /// Calculate the delay to wait after attempt number `attempts` failed.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = base_delay * multiplier^(attempts - 1), then capped.
    ///
    /// With base_delay=5s, multiplier=2.0:
    /// - attempt 1 (first failure): 5s
    /// - attempt 2: 10s
    /// - attempt 3: 20s
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Stateful doubling backoff used by the consumer loop.
///
/// Starts at `seed`, doubles after every call to `next_delay`, never exceeds
/// `max`, and goes back to `seed` on `reset`.
#[derive(Debug, Clone)]
pub struct Backoff {
    seed: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(seed: Duration, max: Duration) -> Self {
        let seed = seed.min(max);
        Self {
            seed,
            max,
            current: seed,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.seed;
    }
}
