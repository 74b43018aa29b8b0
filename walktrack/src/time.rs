//! Time-related utility functions.
//!
//! The engine schedules everything on tokio's monotonic clock but stamps
//! sessions with wall-clock times. [`WallClock`] bridges the two: it anchors
//! a UTC timestamp to a tokio `Instant` once and derives later timestamps from
//! monotonic elapsed time. Wall-clock jumps (NTP, timezone changes) therefore
//! cannot produce negative durations, and paused-time tests see timestamps
//! that advance with `tokio::time::advance`.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Monotonic source of UTC timestamps.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    base_utc: DateTime<Utc>,
    base_instant: Instant,
}

impl WallClock {
    /// Anchor the clock at the current time.
    pub fn new() -> Self {
        Self::anchored(Utc::now(), Instant::now())
    }

    /// Anchor the clock at an explicit pair.
    pub fn anchored(base_utc: DateTime<Utc>, base_instant: Instant) -> Self {
        Self {
            base_utc,
            base_instant,
        }
    }

    /// Current UTC time.
    pub fn now(&self) -> DateTime<Utc> {
        self.at(Instant::now())
    }

    /// UTC time corresponding to `instant`.
    ///
    /// Instants before the anchor map to the anchor itself.
    pub fn at(&self, instant: Instant) -> DateTime<Utc> {
        let elapsed = instant.saturating_duration_since(self.base_instant);
        match chrono::Duration::from_std(elapsed) {
            Ok(delta) => self.base_utc + delta,
            Err(_) => self.base_utc,
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_at_adds_elapsed() {
        let anchor = Instant::now();
        let clock = WallClock::anchored(base(), anchor);

        let later = clock.at(anchor + Duration::from_millis(1500));
        assert_eq!(later, base() + chrono::Duration::milliseconds(1500));
    }

    #[test]
    fn test_before_anchor_clamps() {
        let anchor = Instant::now() + Duration::from_secs(10);
        let clock = WallClock::anchored(base(), anchor);

        assert_eq!(clock.at(Instant::now()), base());
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_paused_time() {
        let clock = WallClock::anchored(base(), Instant::now());
        tokio::time::advance(Duration::from_secs(42)).await;

        assert_eq!(clock.now(), base() + chrono::Duration::seconds(42));
    }
}
