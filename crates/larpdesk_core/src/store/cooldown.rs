//! Re-fetch throttle for `list()`.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Suppresses list fetches for `window` after the last completed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCooldown {
    window: Duration,
    last_completed: Option<DateTime<Utc>>,
}

impl ListCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_completed: None,
        }
    }

    /// A clock that moved backwards never holds the cooldown.
    pub fn is_cooling(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now).is_some()
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_completed?;
        let elapsed = (now - last).to_std().ok()?;
        self.window.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    pub fn mark(&mut self, now: DateTime<Utc>) {
        self.last_completed = Some(now);
    }

    pub fn clear(&mut self) {
        self.last_completed = None;
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::ListCooldown;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn cools_until_window_elapses() {
        let start = Utc.with_ymd_and_hms(2024, 9, 14, 10, 0, 0).unwrap();
        let mut cooldown = ListCooldown::new(Duration::from_secs(10));
        assert!(!cooldown.is_cooling(start));

        cooldown.mark(start);
        assert!(cooldown.is_cooling(start + ChronoDuration::seconds(2)));
        assert_eq!(
            cooldown.remaining(start + ChronoDuration::seconds(4)),
            Some(Duration::from_secs(6))
        );
        assert!(!cooldown.is_cooling(start + ChronoDuration::seconds(10)));
    }

    #[test]
    fn zero_window_never_cools_and_backwards_clock_is_ignored() {
        let start = Utc.with_ymd_and_hms(2024, 9, 14, 10, 0, 0).unwrap();
        let mut zero = ListCooldown::new(Duration::ZERO);
        zero.mark(start);
        assert!(!zero.is_cooling(start));

        let mut cooldown = ListCooldown::new(Duration::from_secs(10));
        cooldown.mark(start);
        assert!(!cooldown.is_cooling(start - ChronoDuration::seconds(1)));
    }
}
