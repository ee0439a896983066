//! Minimum-interval request throttle
//!
//! Every outbound API call of an engine goes through [`Throttle::wait_turn`]
//! right before it is issued, so consecutive calls are at least
//! `min_interval` apart in issue order.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces outbound calls by a fixed minimum interval
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_issue: Mutex::new(None),
        }
    }

    /// Waits until `min_interval` has passed since the previous turn, then
    /// records now as the latest issue time
    ///
    /// The first turn never waits. Concurrent callers are served one at a
    /// time, each measured against the turn before it.
    pub async fn wait_turn(&self) {
        let mut last_issue = self.last_issue.lock().await;

        if let Some(last) = *last_issue {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    "Throttling request for {:?}",
                    ready_at.saturating_duration_since(Instant::now())
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_issue = Some(Instant::now());
    }

    /// Time of the most recent turn, if any
    pub async fn last_issue(&self) -> Option<Instant> {
        *self.last_issue.lock().await
    }
}
