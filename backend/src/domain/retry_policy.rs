//! Retry schedule for failed notification deliveries.
//!
//! Failed deliveries back off exponentially (1, 2, 4, 8, 16 minutes) and then
//! settle on a fixed hourly cadence. A record becomes permanently ineligible
//! once its failed-attempt count reaches `max_attempts`.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Canonical maximum number of failed attempts before a record stops retrying.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Backoff configuration for notification retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed-attempt count at which retries stop.
    pub max_attempts: u32,
    /// Number of leading failures that use exponential growth.
    pub exponential_steps: u32,
    /// Delay after the first failure; doubles for each exponential step.
    pub base_delay: Duration,
    /// Delay applied once the exponential steps are exhausted.
    pub fixed_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            exponential_steps: 5,
            base_delay: Duration::from_secs(60),
            fixed_delay: Duration::from_secs(60 * 60),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the `retry_count`-th failure.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use lending_backend::domain::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff(1), Duration::from_secs(60));
    /// assert_eq!(policy.backoff(5), Duration::from_secs(16 * 60));
    /// assert_eq!(policy.backoff(6), Duration::from_secs(60 * 60));
    /// ```
    pub fn backoff(&self, retry_count: u32) -> Duration {
        if retry_count > self.exponential_steps {
            return self.fixed_delay;
        }
        let exponent = retry_count.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Earliest instant a retry may run after the `retry_count`-th failure.
    pub fn next_retry_at(&self, retry_count: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = TimeDelta::from_std(self.backoff(retry_count)).unwrap_or(TimeDelta::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `retry_count` failures exhaust the retry budget.
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_attempts
    }
}
