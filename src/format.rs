use std::time::Duration;

use chrono::{DateTime, Utc};

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Medium date such as `May 1, 2024`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

pub fn format_distance(km: f64) -> String {
    format!("{km:.2} km")
}

pub fn format_speed(kmh: f64) -> String {
    format!("{kmh:.1} km/h")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::ZERO), "00:00:00");
        assert_eq!(format_duration(Duration::from_millis(59_999)), "00:00:59");
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_duration(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn formats_medium_dates() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        assert_eq!(format_date(&date), "May 1, 2024");
    }

    #[test]
    fn formats_distance_and_speed() {
        assert_eq!(format_distance(12.346), "12.35 km");
        assert_eq!(format_speed(17.26), "17.3 km/h");
    }
}
