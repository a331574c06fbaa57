use std::time::Duration;

/// Exponential backoff with additive jitter, capped.
///
/// `delay(attempt) = min(base * 2^(attempt-1) + jitter, max_delay)` where
/// `jitter` is drawn uniformly from `[0, max_jitter]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(250),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget as the default, with millisecond delays.
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_jitter: Duration::ZERO,
            max_delay: Duration::from_millis(5),
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::random_range(0..=jitter_ms))
        };
        backoff.saturating_add(jitter).min(self.max_delay)
    }
}

/// 408, 429 and every 5xx are worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}
