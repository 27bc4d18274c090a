//! Retry policy: decides backoff delays for busy-file deletion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for deleting files held by another process.
///
/// Defaults: 4 attempts in total (the first try plus 3 retries), waiting
/// 500ms, 1s and 2s in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Total number of removal attempts, including the first one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_attempts: 4,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `attempts`-th failed attempt (1-indexed).
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    }

    /// Longest time a deletion can spend waiting between attempts.
    pub fn max_total_delay(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.next_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_matches_busy_file_cleanup() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_attempts, 4);
    }

    #[rstest]
    #[case::first(1, 500)]
    #[case::second(2, 1000)]
    #[case::third(3, 2000)]
    #[case::zero_uses_base(0, 500)]
    fn exponential_backoff_doubles(#[case] attempts: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(attempts), Duration::from_millis(expected_ms));
    }

    #[test]
    fn max_total_delay_sums_all_waits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_total_delay(), Duration::from_millis(3500));

        let single = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(single.max_total_delay(), Duration::ZERO);
    }
}
