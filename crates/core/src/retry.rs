//! Exponential backoff policy
//!
//! The recompute scheduler retries failed builds on every subsequent cycle
//! (eventual consistency, no retry cap); this policy shapes the delay
//! between consecutive failed attempts so a broken store is not hammered.

use std::time::Duration;

/// Backoff policy for consecutive failures
///
/// Delay grows as `base * 2^attempt`, capped at `max_delay_ms`, with
/// optional jitter of up to 30% to spread retries across instances.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay in milliseconds for the first retry
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds to cap exponential growth
    pub max_delay_ms: u64,

    /// Whether to add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    /// - base_delay_ms: 1000
    /// - max_delay_ms: 60000
    /// - jitter: true
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64, jitter: bool) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            jitter,
        }
    }

    /// Gentle preset for background work that should back off graciously
    ///
    /// - base_delay_ms: 5000
    /// - max_delay_ms: 300000
    pub fn gentle() -> Self {
        Self {
            base_delay_ms: 5_000,
            max_delay_ms: 300_000,
            jitter: true,
        }
    }

    /// Delay before the next attempt, given how many consecutive failures
    /// have already happened (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));

        let capped_delay = exponential_delay.min(self.max_delay_ms);

        let final_delay = if self.jitter {
            let jitter_range = (capped_delay as f64 * 0.3) as u64;
            let jitter = if jitter_range > 0 {
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                nanos % (jitter_range + 1)
            } else {
                0
            };
            capped_delay.saturating_add(jitter)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_progression() {
        let policy = RetryPolicy::new(100, 10_000, false);

        assert_eq!(policy.delay_for_attempt(0).as_millis(), 100);
        assert_eq!(policy.delay_for_attempt(1).as_millis(), 200);
        assert_eq!(policy.delay_for_attempt(2).as_millis(), 400);
        assert_eq!(policy.delay_for_attempt(3).as_millis(), 800);
        assert_eq!(policy.delay_for_attempt(4).as_millis(), 1600);
    }

    #[test]
    fn test_max_cap() {
        let policy = RetryPolicy::new(100, 500, false);

        // 100 * 2^5 = 3200, capped at 500
        assert_eq!(policy.delay_for_attempt(5).as_millis(), 500);
        assert_eq!(policy.delay_for_attempt(30).as_millis(), 500);
    }

    #[test]
    fn test_no_overflow_on_large_attempt() {
        let policy = RetryPolicy::new(1_000, 60_000, false);
        assert_eq!(policy.delay_for_attempt(u32::MAX).as_millis(), 60_000);
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = RetryPolicy::new(1_000, 5_000, true);

        let delay_ms = policy.delay_for_attempt(0).as_millis();
        assert!(delay_ms >= 1_000);
        assert!(delay_ms <= 1_300);
    }

    #[test]
    fn test_gentle_preset() {
        let policy = RetryPolicy::gentle();
        assert_eq!(policy.base_delay_ms, 5_000);
        assert_eq!(policy.max_delay_ms, 300_000);
        assert!(policy.jitter);
    }
}
