//! Backoff policies for connection retries.

use std::time::Duration;

/// Maps a failure count to the wait before the next attempt.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Quadratic backoff: `attempt² × unit`.
///
/// Attempt-indexed and deterministic: with a one second unit the schedule is
/// 0, 1, 4, 9, 16, 25 seconds for attempts 0 through 5. No jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticBackoff {
    unit: Duration,
}

impl QuadraticBackoff {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

impl Default for QuadraticBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffPolicy for QuadraticBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.saturating_mul(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_schedule_in_seconds() {
        let backoff = QuadraticBackoff::default();
        let schedule: Vec<u64> = (0..=5).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(schedule, vec![0, 1, 4, 9, 16, 25]);
    }

    #[test]
    fn is_not_exponential() {
        let backoff = QuadraticBackoff::default();
        // 2^(n-1) would give 16s here.
        assert_eq!(backoff.delay(5), Duration::from_secs(25));
        assert_eq!(backoff.delay(3), Duration::from_secs(9));
    }

    #[test]
    fn scales_with_unit() {
        let backoff = QuadraticBackoff::new(Duration::from_millis(10));
        assert_eq!(backoff.delay(3), Duration::from_millis(90));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let backoff = QuadraticBackoff::default();
        assert!(backoff.delay(u32::MAX) >= Duration::from_secs(u64::from(u32::MAX)));
    }
}
