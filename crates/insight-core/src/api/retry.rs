use std::time::Duration;

use crate::error::InsightError;

/// How the request engine reacts to a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retry failed requests until they succeed (or are cancelled).
    pub enabled: bool,
    /// Wait before the first retry of every logical request.
    pub initial_backoff: Duration,
    /// Growth factor applied to the wait after each failure. Must exceed 1.
    pub multiplier: f64,
    /// Ceiling for the wait; retries continue at this rate once reached.
    pub max_backoff: Duration,
    /// Log every failure and wait at `warn` instead of `debug`.
    pub verbose: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(60),
            verbose: false,
        }
    }
}

impl RetryPolicy {
    pub(crate) fn validate(&self) -> Result<(), InsightError> {
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            return Err(InsightError::Config(format!(
                "backoff multiplier must be a finite number greater than 1, got {}",
                self.multiplier
            )));
        }
        if self.initial_backoff.is_zero() {
            return Err(InsightError::Config(
                "initial backoff must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Calculate the wait that follows `current`:
/// `min(current * multiplier, max_backoff)`.
///
/// Computed in nanoseconds so that millisecond-scale policies stay exact.
pub fn next_backoff(current: Duration, multiplier: f64, max_backoff: Duration) -> Duration {
    let scaled = (current.as_nanos() as f64 * multiplier).round();
    if !scaled.is_finite() || scaled >= max_backoff.as_nanos() as f64 {
        return max_backoff;
    }
    Duration::from_nanos(scaled as u64).min(max_backoff)
}

/// Wait schedule of one logical request.
///
/// Created fresh for every request so no state leaks between calls. The
/// n-th wait is `min(initial * multiplier^(n-1), max_backoff)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            current: policy.initial_backoff.min(policy.max_backoff),
            multiplier: policy.multiplier,
            max_backoff: policy.max_backoff,
        }
    }

    /// Return the wait to apply now and grow the schedule.
    pub fn next_wait(&mut self) -> Duration {
        let wait = self.current;
        self.current = next_backoff(self.current, self.multiplier, self.max_backoff);
        wait
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_wait())
    }
}
