//! Reconnect delay policy for the event stream

use std::time::Duration;

use crate::config::StreamConfig;

/// Multiplicative backoff, capped, reset after a successful open
#[derive(Debug, Clone)]
pub struct Backoff {
    initial_ms: u64,
    multiplier: f64,
    max_ms: u64,
    next_ms: u64,
}

impl Backoff {
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        let initial_ms = initial.as_millis() as u64;
        let max_ms = (max.as_millis() as u64).max(initial_ms);
        Self {
            initial_ms,
            multiplier: multiplier.max(1.0),
            max_ms,
            next_ms: initial_ms,
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_backoff_ms),
            config.backoff_multiplier,
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// Delay before the next attempt; advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next_ms;
        let grown = (self.next_ms as f64 * self.multiplier).round();
        self.next_ms = if grown >= self.max_ms as f64 {
            self.max_ms
        } else {
            grown as u64
        };
        Duration::from_millis(delay)
    }

    /// Back to the initial delay
    pub fn reset(&mut self) {
        self.next_ms = self.initial_ms;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&StreamConfig::default())
    }
}
