//! Time sources.
//!
//! Sessions never read the wall clock directly. Activity stamps, countdown
//! starts and staleness checks all go through a [`Clock`], so tests can move
//! time forward without sleeping.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// # Example
///
/// ```rust
/// use guesswho::env::{Clock, ManualClock};
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let start = Utc::now();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::from_secs(90));
///
/// assert_eq!((clock.now() - start).num_seconds(), 90);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward. Saturates instead of overflowing.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = next;
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Time elapsed from `since` to `now`, clamped to zero when `since` is later.
pub fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
