//! Reconnection policy: exponential backoff with a bounded attempt budget.
//!
//! Delay for attempt `n` (0-indexed, read before increment) is
//! `min(30, 2^n)` seconds. After [`MAX_ATTEMPTS`] consecutive failures the
//! policy refuses further attempts until [`reset`](ReconnectPolicy::reset)
//! — which happens exactly once per successful open, never on a failed
//! attempt. There is no jitter and no cooldown window: rapid open/close
//! cycles keep incrementing monotonically.

use std::time::Duration;

use crate::error::BridgeError;

/// Attempt budget before the policy gives up.
pub const MAX_ATTEMPTS: u32 = 10;

/// Delay ceiling in seconds.
pub const MAX_DELAY_SECS: u64 = 30;

/// Tracks consecutive unexpected closes and produces the next delay.
#[derive(Debug)]
pub(crate) struct ReconnectPolicy {
    /// Attempt index for the next close: 0 after a successful open.
    attempts: u32,
}

impl ReconnectPolicy {
    pub(crate) fn new() -> Self {
        Self { attempts: 0 }
    }

    /// Delay before the next attempt, advancing the attempt index.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::RetryExhausted`] once the budget is spent;
    /// the attempt index is left untouched in that case.
    pub(crate) fn next_delay(&mut self) -> Result<Duration, BridgeError> {
        if self.attempts >= MAX_ATTEMPTS {
            return Err(BridgeError::RetryExhausted);
        }
        let exp = 1u64.checked_shl(self.attempts).unwrap_or(u64::MAX);
        let delay = Duration::from_secs(exp.min(MAX_DELAY_SECS));
        self.attempts += 1;
        Ok(delay)
    }

    /// Reset the attempt index after a successful open.
    pub(crate) fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Current attempt index (consecutive closes since the last open).
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}
