//! Target day selection
//!
//! Either an explicit date, or "today" in a configured timezone minus a
//! number of days. Formatted as `YYYYMMDD` for the query parameter.

use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

/// The day whose crash events are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDay(NaiveDate);

impl TargetDay {
    /// Pick the target day
    ///
    /// An explicit, non-blank date wins. Otherwise the day is `now` in
    /// `timezone` minus `days_back`.
    pub fn resolve(
        explicit: Option<&str>,
        timezone: &str,
        days_back: u32,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(raw) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Self::parse(raw);
        }

        let tz: Tz = timezone
            .parse()
            .map_err(|_| Error::InvalidTimezone(timezone.to_string()))?;
        let today = now.with_timezone(&tz).date_naive();
        today
            .checked_sub_days(Days::new(u64::from(days_back)))
            .map(Self)
            .ok_or_else(|| Error::InvalidTargetDate(format!("today - {days_back} days")))
    }

    /// Parse `YYYYMMDD` or `YYYY-MM-DD`
    pub fn parse(raw: &str) -> Result<Self> {
        NaiveDate::parse_from_str(raw, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .map(Self)
            .map_err(|_| Error::InvalidTargetDate(raw.to_string()))
    }

    /// Query parameter form, `YYYYMMDD`
    pub fn as_param(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for TargetDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_explicit_date_formats() {
        let a = TargetDay::parse("20240115").unwrap();
        let b = TargetDay::parse("2024-01-15").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_param(), "20240115");
        assert_eq!(a.to_string(), "2024-01-15");
    }

    #[test]
    fn test_invalid_date() {
        assert!(matches!(
            TargetDay::parse("2024/01/15"),
            Err(Error::InvalidTargetDate(_))
        ));
    }

    #[test]
    fn test_default_uses_timezone_and_offset() {
        // 2024-03-01 16:00 UTC is already 2024-03-02 in Tokyo.
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap();

        let tokyo = TargetDay::resolve(None, "Asia/Tokyo", 1, now).unwrap();
        assert_eq!(tokyo.as_param(), "20240301");

        let utc = TargetDay::resolve(None, "UTC", 1, now).unwrap();
        assert_eq!(utc.as_param(), "20240229");

        let two_back = TargetDay::resolve(Some("  "), "Asia/Tokyo", 2, now).unwrap();
        assert_eq!(two_back.as_param(), "20240229");
    }

    #[test]
    fn test_explicit_wins_over_default() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let day = TargetDay::resolve(Some("20231231"), "Asia/Tokyo", 1, now).unwrap();
        assert_eq!(day.as_param(), "20231231");
    }

    #[test]
    fn test_unknown_timezone() {
        let now = Utc::now();
        assert!(matches!(
            TargetDay::resolve(None, "Mars/Olympus", 1, now),
            Err(Error::InvalidTimezone(_))
        ));
    }
}
