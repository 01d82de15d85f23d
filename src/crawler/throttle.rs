//! Request throttle shared by every page worker
//!
//! The throttle enforces a minimum interval between consecutive request
//! issue times for the whole run, regardless of how many workers are active.
//! The lock is held while sleeping, so waiters are released one at a time.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct Throttle {
    delay: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_issue: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until a request may be issued and claims that slot
    ///
    /// The first call returns immediately. Each later call returns no earlier
    /// than `delay` after the previous slot. Returns the claimed issue time.
    pub async fn wait(&self) -> Instant {
        let mut last_issue = self.last_issue.lock().await;

        if let Some(previous) = *last_issue {
            tokio::time::sleep_until(previous + self.delay).await;
        }

        let now = Instant::now();
        *last_issue = Some(now);
        now
    }
}
