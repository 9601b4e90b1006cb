use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{Result, WhaleScopeError};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive day range, interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse optional `YYYY-MM-DD` bounds; missing `end` is today, missing
    /// `start` is `default_days` before `end`.
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        default_days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let end = match end {
            Some(raw) => parse_date(raw)?,
            None => now.date_naive(),
        };
        let start = match start {
            Some(raw) => parse_date(raw)?,
            None => end - Duration::days(default_days),
        };

        if start > end {
            return Err(WhaleScopeError::InvalidRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(self.start, NaiveTime::MIN))
    }

    /// Midnight at the start of `end`.
    pub fn end_at(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(self.end, NaiveTime::MIN))
    }

    pub fn start_ms(&self) -> i64 {
        self.start_at().timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end_at().timestamp_millis()
    }

    /// Whether `at` falls between the start and end midnights, inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_at() && at <= self.end_at()
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| WhaleScopeError::InvalidDate(raw.to_string()))
}

pub fn from_unix_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

pub fn from_unix_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// `YYYY-MM-DDTHH:MM:SS[.ffffff]`: microseconds, dropped when zero.
pub fn isoformat(at: &DateTime<Utc>) -> String {
    if at.timestamp_subsec_micros() == 0 {
        at.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 5, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_defaults_to_window_ending_today() {
        let range = DateRange::resolve(None, None, 180, now()).unwrap();
        assert_eq!(range.end_str(), "2025-06-05");
        assert_eq!(range.start_str(), "2024-12-07");
    }

    #[test]
    fn test_explicit_bounds() {
        let range = DateRange::resolve(Some("2025-05-01"), Some("2025-05-02"), 1, now()).unwrap();
        assert_eq!(range.start_ms(), 1_746_057_600_000);
        assert_eq!(range.end_ms(), 1_746_144_000_000);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            DateRange::resolve(Some("05/01/2025"), None, 1, now()),
            Err(WhaleScopeError::InvalidDate(_))
        ));
        assert!(matches!(
            DateRange::resolve(Some("2025-06-10"), Some("2025-06-01"), 1, now()),
            Err(WhaleScopeError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::resolve(Some("2025-05-01"), Some("2025-05-02"), 1, now()).unwrap();
        assert!(range.contains(range.start_at()));
        assert!(range.contains(range.end_at()));
        assert!(!range.contains(range.end_at() + Duration::seconds(1)));
    }

    #[test]
    fn test_isoformat_precision() {
        assert_eq!(isoformat(&now()), "2025-06-05T14:30:00");
        let at = from_unix_ms(1_749_124_800_007).unwrap();
        assert_eq!(isoformat(&at), "2025-06-05T12:00:00.007000");
    }
}
