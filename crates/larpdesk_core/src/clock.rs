//! Injectable wall clock.
//!
//! Stores stamp `created_at`/`updated_at`, derive local ids, and evaluate the
//! list cooldown through a `Clock` so tests can drive time explicitly.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `step`.
    ///
    /// Steps too large for `chrono` saturate at the current time.
    pub fn advance(&self, step: Duration) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(delta) = chrono::Duration::from_std(step) {
            if let Some(next) = current.checked_add_signed(delta) {
                *current = next;
            }
        }
    }

    pub fn set(&self, value: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn manual_clock_advances_by_step() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(90));
        assert_eq!((clock.now() - start).num_seconds(), 90);
    }
}
