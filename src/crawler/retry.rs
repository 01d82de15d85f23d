use crate::config::CrawlerConfig;
use crate::PageError;
use std::time::Duration;

/// Upper bound on a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Bounded exponential backoff for transient page errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff())
    }

    /// Total requests a page may issue, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Returns true if a page that failed with `error` after `attempts`
    /// requests should be tried again
    pub fn should_retry(&self, error: &PageError, attempts: u32) -> bool {
        error.is_transient() && attempts < self.max_attempts()
    }

    /// Sleep before the next attempt, after `attempts` failed requests
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        self.backoff
            .checked_mul(1u32 << exponent)
            .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}
