//! Parsing and checks for booking input.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use shared_models::appointment::local_to_utc;

use crate::models::AppointmentError;

pub const MIN_TITLE_LENGTH: usize = 3;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]?\d|2[0-3]):([0-5]\d)$").expect("time pattern is valid")
});

/// Strict `YYYY-MM-DD` that must also be a real calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    let raw = raw.trim();
    if !DATE_PATTERN.is_match(raw) {
        return Err(AppointmentError::InvalidDateFormat(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppointmentError::InvalidDateFormat(raw.to_string()))
}

/// 24h `H:MM` or `HH:MM`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    let raw = raw.trim();
    let caps = TIME_PATTERN
        .captures(raw)
        .ok_or_else(|| AppointmentError::InvalidTimeFormat(raw.to_string()))?;

    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| AppointmentError::InvalidTimeFormat(raw.to_string()))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| AppointmentError::InvalidTimeFormat(raw.to_string()))?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| AppointmentError::InvalidTimeFormat(raw.to_string()))
}

pub fn validate_title(title: &str) -> Result<String, AppointmentError> {
    let title = title.trim();
    if title.chars().count() < MIN_TITLE_LENGTH {
        return Err(AppointmentError::InvalidTitle {
            min: MIN_TITLE_LENGTH,
        });
    }
    Ok(title.to_string())
}

/// Rejects a slot whose start lies before `now`.
pub fn ensure_not_past(
    date: NaiveDate,
    time: NaiveTime,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> Result<(), AppointmentError> {
    if local_to_utc(date, time, offset) < now {
        return Err(AppointmentError::PastDateTime);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn accepts_canonical_and_short_times() {
        assert_eq!(parse_time("14:00").unwrap(), NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        assert_eq!(parse_time("9:05").unwrap(), NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert_eq!(parse_time("09:05").unwrap(), parse_time("9:05").unwrap());
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in ["24:00", "12:60", "1200", "12:5", "noon", ""] {
            assert_matches!(parse_time(raw), Err(AppointmentError::InvalidTimeFormat(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        for raw in ["2030-1-10", "10/01/2030", "2030-02-30", "2030-13-01", ""] {
            assert_matches!(parse_date(raw), Err(AppointmentError::InvalidDateFormat(_)), "{raw}");
        }
        assert_eq!(
            parse_date("2030-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 10).unwrap()
        );
    }

    #[test]
    fn title_needs_three_characters() {
        assert_matches!(validate_title("  ab "), Err(AppointmentError::InvalidTitle { min: 3 }));
        assert_eq!(validate_title(" Hearing ").unwrap(), "Hearing");
    }

    #[test]
    fn past_check_honours_offset() {
        let now = Utc.with_ymd_and_hms(2030, 1, 10, 15, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        let time = NaiveTime::from_hms_opt(14, 0, 0).unwrap();

        let utc = FixedOffset::east_opt(0).unwrap();
        assert_matches!(ensure_not_past(date, time, utc, now), Err(AppointmentError::PastDateTime));

        // 14:00 at UTC-3 is 17:00 UTC.
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        assert!(ensure_not_past(date, time, brt, now).is_ok());
    }
}
