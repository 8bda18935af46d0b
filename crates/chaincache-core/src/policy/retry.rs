//! Fixed backoff with bounded random jitter for the single follow-up attempt.

use std::time::Duration;

use rand::Rng;

/// Configuration for the retry delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Base delay before the retry runs.
    pub backoff: Duration,
    /// Upper bound (exclusive) of the random jitter added to `backoff`.
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(8_000),
            max_jitter: Duration::from_millis(1_500),
        }
    }
}

impl RetryConfig {
    /// Returns `backoff + U[0, max_jitter)`.
    pub fn delay(&self) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.backoff;
        }
        let extra = rand::thread_rng().gen_range(0..jitter_ms);
        self.backoff + Duration::from_millis(extra)
    }

    /// Longest delay `delay()` can return.
    pub fn max_delay(&self) -> Duration {
        self.backoff + self.max_jitter
    }
}

/// Which try of a refresh cycle is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Regular tick or manual trigger; a failure schedules one retry.
    First,
    /// The scheduled retry; a failure waits for the next tick.
    Retry,
}

impl Attempt {
    pub fn is_retry(self) -> bool {
        self == Self::Retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_within_bounds() {
        let cfg = RetryConfig::default();
        for _ in 0..200 {
            let d = cfg.delay();
            assert!(d >= Duration::from_millis(8_000), "d={d:?}");
            assert!(d < Duration::from_millis(9_500), "d={d:?}");
        }
        assert_eq!(cfg.max_delay(), Duration::from_millis(9_500));
    }

    #[test]
    fn zero_jitter_is_exact() {
        let cfg = RetryConfig {
            backoff: Duration::from_millis(250),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(cfg.delay(), Duration::from_millis(250));
    }
}
