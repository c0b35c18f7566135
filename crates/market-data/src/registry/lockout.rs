//! Cooldown-on-failure for a single provider.
//!
//! After a provider says "stop" (HTTP 429, quota message) it is locked until a
//! fixed instant. The lock clears lazily: the first [`LockoutTimer::is_locked`]
//! call at or after the unlock instant releases it.

use chrono::{DateTime, Duration, Utc};
use log::info;

#[derive(Debug, Clone, Default)]
pub struct LockoutTimer {
    unlock_at: Option<DateTime<Utc>>,
}

impl LockoutTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the provider is locked at `now`. Clears an expired lock.
    pub fn is_locked(&mut self, now: DateTime<Utc>) -> bool {
        match self.unlock_at {
            Some(until) if now < until => true,
            Some(until) => {
                info!("Lockout expired at {}, provider is callable again", until);
                self.unlock_at = None;
                false
            }
            None => false,
        }
    }

    /// Lock until `now + duration`, or keep the existing expiry if it is later.
    ///
    /// Returns the effective unlock instant.
    pub fn lock(&mut self, now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
        let candidate = now + duration;
        let until = match self.unlock_at {
            Some(existing) if existing >= candidate => existing,
            _ => candidate,
        };
        self.unlock_at = Some(until);
        until
    }

    /// Instant the current lock expires, if any. Does not clear stale locks.
    pub fn unlock_at(&self) -> Option<DateTime<Utc>> {
        self.unlock_at
    }

    /// Manual override from an operator.
    pub fn force_unlock(&mut self) {
        self.unlock_at = None;
    }
}
