use std::{convert::TryFrom, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn duration_to_ms(duration: Duration) -> Result<i64> {
    i64::try_from(duration.as_millis())
        .map_err(|_| anyhow!("duration {duration:?} exceeds SQLite INTEGER range"))
}

pub fn duration_from_ms(value: i64, field: &str) -> Result<Duration> {
    to_u64(value, field).map(Duration::from_millis)
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);

        let (a, b) = (format_datetime(&earlier), format_datetime(&later));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_datetime(&b, "date").unwrap(), later);
    }

    #[test]
    fn rejects_negative_durations() {
        assert!(duration_from_ms(-1, "total_duration_ms").is_err());
        assert_eq!(
            duration_from_ms(1500, "total_duration_ms").unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn integers_stay_in_sqlite_range() {
        assert_eq!(to_i64(140).unwrap(), 140);
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_u64(-1, "average_heart_rate").is_err());
    }
}
