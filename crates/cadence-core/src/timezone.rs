use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone)
        .map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// The calendar in which due dates are stepped.
///
/// Resolvers work on calendar dates; a due instant is projected into this
/// timezone, its date is advanced, and the original wall-clock time is
/// re-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Default for Calendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(timezone: &str) -> Result<Self, CoreError> {
        validate_timezone(timezone).map(Self::new)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar date of `instant` in this timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Moves `instant` to `date`, keeping its local wall-clock time.
    pub fn with_date(&self, instant: DateTime<Utc>, date: NaiveDate) -> DateTime<Utc> {
        let local_time = instant.with_timezone(&self.tz).time();
        self.resolve_local(date, local_time)
    }

    /// Maps a local date and time to UTC, tolerating DST transitions.
    ///
    /// Ambiguous times take the earlier instant. Times skipped by a spring
    /// forward move one hour later.
    pub fn resolve_local(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        if let Some(local_dt) = self.tz.from_local_datetime(&date.and_time(time)).earliest() {
            return local_dt.with_timezone(&Utc);
        }
        let (shifted, _) = time.overflowing_add_signed(chrono::Duration::hours(1));
        match self.tz.from_local_datetime(&date.and_time(shifted)).earliest() {
            Some(local_dt) => local_dt.with_timezone(&Utc),
            None => date.and_time(time).and_utc(),
        }
    }
}

/// Format datetime with timezone-aware display
pub fn format_with_timezone(datetime: DateTime<Utc>, calendar: &Calendar, format: &str) -> String {
    datetime.with_timezone(&calendar.timezone()).format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(matches!(
            validate_timezone("Invalid/Timezone"),
            Err(CoreError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let calendar = Calendar::from_name("America/New_York").unwrap();
        // 02:00 UTC is still the previous evening in New York.
        let instant = Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap();
        assert_eq!(
            calendar.local_date(instant),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_with_date_keeps_wall_clock_across_dst() {
        let calendar = Calendar::from_name("America/New_York").unwrap();
        // 09:00 EST on March 7th 2025 (UTC-5).
        let before = Utc.with_ymd_and_hms(2025, 3, 7, 14, 0, 0).unwrap();
        let after = calendar.with_date(before, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        // 09:00 EDT (UTC-4) after the spring forward.
        assert_eq!(after, Utc.with_ymd_and_hms(2025, 3, 14, 13, 0, 0).unwrap());
        assert_eq!(after.with_timezone(&calendar.timezone()).hour(), 9);
    }

    #[test]
    fn test_resolve_local_skipped_hour() {
        let calendar = Calendar::from_name("America/New_York").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let resolved = calendar.resolve_local(date, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert_eq!(resolved.with_timezone(&calendar.timezone()).hour(), 3);
    }

    #[test]
    fn test_format_with_timezone() {
        let calendar = Calendar::default();
        let instant = Utc.with_ymd_and_hms(2025, 1, 31, 8, 30, 0).unwrap();
        assert_eq!(format_with_timezone(instant, &calendar, "%Y-%m-%d %H:%M"), "2025-01-31 08:30");
    }
}
