use std::time::Duration;

use backoff::backoff::Backoff;

use crate::config::ReconnectConfig;

/// Deterministic doubling backoff bounded by an attempt budget.
///
/// Attempt *n* (1-indexed) waits [`ReconnectConfig::delay_for_attempt`]`(n)`. Once
/// `max_reconnect_attempts` delays have been handed out, [`Backoff::next_backoff`]
/// returns `None` and the caller stops retrying.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectBackoff {
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Attempts scheduled since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_reconnect_attempts
    }
}

impl From<ReconnectConfig> for ReconnectBackoff {
    fn from(config: ReconnectConfig) -> Self {
        Self::new(config)
    }
}

impl Backoff for ReconnectBackoff {
    fn reset(&mut self) {
        self.attempts = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts = self.attempts.saturating_add(1);
        Some(self.config.delay_for_attempt(self.attempts))
    }
}
