//! Session expiry.
//!
//! Each session carries a deadline set relative to creation and refreshed on
//! conversational activity. The session loop arms a one-shot wake-up against
//! it, but firing alone is never enough: expiry is decided by comparing the
//! stored timestamp against the clock, so a wake-up that lands early (the
//! deadline moved after the timer was armed) is a no-op.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionDeadline {
    ttl: ChronoDuration,
    expires_at: DateTime<Utc>,
}

impl SessionDeadline {
    pub fn new(ttl: Duration) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(1));
        Self {
            ttl,
            expires_at: Utc::now() + ttl,
        }
    }

    /// Pushes the deadline out by one TTL from now.
    pub fn refresh(&mut self) {
        self.expires_at = Utc::now() + self.ttl;
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the stored deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The instant a one-shot wake-up should fire at, as of now.
    pub fn wake_instant(&self) -> Instant {
        let remaining = (self.expires_at - Utc::now()).to_std().unwrap_or_default();
        Instant::now() + remaining
    }
}
