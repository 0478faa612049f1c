//! Local wall-clock time source and timestamp formats.
//!
//! All scheduling is done in local wall-clock time without offsets. Stored
//! timestamps written by this crate use `YYYY-MM-DDTHH:MM:SS`; RFC 3339
//! timestamps (e.g. from older backups) are read and converted to local time.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The device clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Format a local timestamp as `YYYY-MM-DDTHH:MM:SS`.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse a stored timestamp into local wall-clock time.
///
/// Accepts RFC 3339 (converted to local time) and offset-less local
/// timestamps with or without seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_format_and_parse_round_trip() {
        let now = at(3, 14, 5);
        assert_eq!(format_timestamp(now), "2024-01-03T14:05:00");
        assert_eq!(parse_timestamp(&format_timestamp(now)), Some(now));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(parse_timestamp("2024-01-03T14:05"), Some(at(3, 14, 5)));
        assert_eq!(
            parse_timestamp("2024-01-03T14:05:00.250"),
            Some(at(3, 14, 5) + Duration::milliseconds(250))
        );
        assert!(parse_timestamp("2024-01-03T14:05:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(at(1, 8, 0));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        clock.advance(Duration::hours(20));
        assert_eq!(clock.now(), at(2, 4, 0));

        clock.set(at(9, 0, 0));
        assert_eq!(clock.now(), at(9, 0, 0));
    }
}
