// ── Failure backoff policy ──
//
// Exponential backoff with a cap, plus verbatim honouring of
// server-supplied retry-after hints when they exceed the computed
// delay. Pure state machine — the coordinator owns the actual sleeps.

use std::time::Duration;

/// Tuning for [`Backoff`].
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub base: Duration,
    /// Cap, expressed as a multiplier of `base` (delay never exceeds
    /// `base * max_multiplier`).
    pub max_multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            max_multiplier: 32,
        }
    }
}

/// Consecutive-failure counter with exponential delay.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return the delay before the next attempt.
    ///
    /// `retry_after` is a server-supplied hint (rate limiting); it is
    /// honoured verbatim whenever it is larger than the computed
    /// exponential delay.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Duration {
        let multiplier = 1u32
            .checked_shl(self.failures)
            .unwrap_or(self.config.max_multiplier)
            .min(self.config.max_multiplier);
        self.failures = self.failures.saturating_add(1);

        let computed = self.config.base.saturating_mul(multiplier);
        match retry_after {
            Some(hint) if hint > computed => hint,
            _ => computed,
        }
    }

    /// Reset after a successful cycle.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Number of consecutive failures recorded since the last reset.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}
