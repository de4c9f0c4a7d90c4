//! Clock and timing utilities.
//!
//! Wall-clock time is read through the [`Clock`] trait so that persisted
//! timestamps and export filenames can be pinned in tests. [`Stopwatch`]
//! measures elapsed time for log fields.

use std::time::Instant;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Offset of the operator's time zone at [`Clock::now`].
    fn local_offset(&self) -> FixedOffset;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Clock frozen at a single instant, in the time zone it was written in.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 timestamp; its offset becomes the local zone.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self(DateTime::parse_from_rfc3339(rfc3339)?))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    fn local_offset(&self) -> FixedOffset {
        *self.0.offset()
    }
}

/// ISO 8601 timestamp with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar date (`YYYY-MM-DD`) of `at` in its own time zone.
pub fn date_slug(at: &DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// The operator's local date, used as the export filename prefix.
pub fn local_date_slug(clock: &dyn Clock) -> String {
    date_slug(&clock.now().with_timezone(&clock.local_offset()))
}

/// Monotonic timer for reporting how long an operation took.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds elapsed since start.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_formats() {
        let clock = FixedClock::parse("2024-03-10T09:30:00Z").unwrap();
        let now = clock.now();
        assert_eq!(iso_timestamp(&now), "2024-03-10T09:30:00.000Z");
        assert_eq!(local_date_slug(&clock), "2024-03-10");
    }

    #[test]
    fn test_local_date_slug_keeps_evening_on_same_day() {
        // 23:30 in UTC-5 is already 04:30 the next day in UTC.
        let clock = FixedClock::parse("2024-03-10T23:30:00-05:00").unwrap();
        assert_eq!(iso_timestamp(&clock.now()), "2024-03-11T04:30:00.000Z");
        assert_eq!(local_date_slug(&clock), "2024-03-10");
    }

    #[test]
    fn test_local_date_slug_east_of_utc() {
        let clock = FixedClock::parse("2024-03-10T22:00:00Z").unwrap();
        let tokyo = FixedClock(clock.0.with_timezone(&FixedOffset::east_opt(9 * 3600).unwrap()));
        assert_eq!(local_date_slug(&tokyo), "2024-03-11");
    }

    #[test]
    fn test_stopwatch_elapsed() {
        let watch = Stopwatch::start();
        assert!(watch.elapsed_ms() < 1_000);
    }
}
