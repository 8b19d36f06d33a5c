//! Fixed-delay retry policy for directory discovery.
//!
//! No growth and no jitter:
//! every failed attempt except the last is followed by the same delay.

use std::time::Duration;

/// Default number of discovery attempts.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default delay between failed attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after each failed attempt that is not the last.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that tries once and never waits.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Attempts actually made, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based), or
    /// `None` when that was the last attempt.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.attempts() {
            Some(self.delay)
        } else {
            None
        }
    }

    /// Total time spent waiting when every attempt fails.
    pub fn worst_case_wait(&self) -> Duration {
        self.delay * (self.attempts() - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}
