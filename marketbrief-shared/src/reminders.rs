/// Reminder time helpers
///
/// Users store their daily summary time as a wall-clock "HH:MM" string in
/// an IANA timezone of their choosing. Everything that touches those
/// values funnels through here: times are normalized to zero-padded form
/// on write, timezone names are resolved against the IANA database, and
/// the dispatch loop converts a shared UTC tick instant into each user's
/// local minute for comparison. Keeping the conversion on the UTC side
/// (instead of reparsing "HH:MM" into the user's zone) makes DST days
/// behave: a skipped local hour simply never comes up for comparison, and
/// no arithmetic on nonexistent local times is ever attempted.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Error type for reminder setting validation
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// The time string is not a valid "HH:MM" wall-clock time
    #[error("Invalid time format. Use HH:MM format (e.g., 09:30)")]
    InvalidTimeFormat(String),

    /// The timezone name is not in the IANA database
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Validates and normalizes a reminder time to zero-padded "HH:MM"
///
/// Accepts unpadded input like "9:30" and returns "09:30", so stored
/// times always compare equal to the zero-padded local minute the
/// dispatch loop computes.
///
/// # Errors
///
/// Returns [`ReminderError::InvalidTimeFormat`] for anything that is not
/// a parseable 24-hour wall-clock time ("24:00", "09:75", "09:30:00").
pub fn normalize_reminder_time(input: &str) -> Result<String, ReminderError> {
    let time = NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| ReminderError::InvalidTimeFormat(input.to_string()))?;

    Ok(time.format("%H:%M").to_string())
}

/// Resolves an IANA timezone name
///
/// # Errors
///
/// Returns [`ReminderError::UnknownTimezone`] for names the IANA
/// database does not know.
pub fn resolve_timezone(name: &str) -> Result<Tz, ReminderError> {
    Tz::from_str(name).map_err(|_| ReminderError::UnknownTimezone(name.to_string()))
}

/// Formats a UTC instant as a zero-padded local "HH:MM" in the given zone
pub fn local_minute(tz: Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// Formats a UTC instant as a local "YYYY-MM-DD HH:MM" dispatch stamp
///
/// Used as the per-user dedupe key: one dispatch per local calendar
/// minute, which also collapses the repeated hour on fall-back days into
/// a single send.
pub fn local_stamp(tz: Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_padded_time_unchanged() {
        assert_eq!(normalize_reminder_time("09:30").unwrap(), "09:30");
        assert_eq!(normalize_reminder_time("00:00").unwrap(), "00:00");
        assert_eq!(normalize_reminder_time("23:59").unwrap(), "23:59");
    }

    #[test]
    fn test_normalize_pads_short_hour() {
        assert_eq!(normalize_reminder_time("9:30").unwrap(), "09:30");
        assert_eq!(normalize_reminder_time("7:05").unwrap(), "07:05");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_reminder_time(" 09:30 ").unwrap(), "09:30");
    }

    #[test]
    fn test_normalize_rejects_invalid_times() {
        for input in ["24:00", "09:60", "9:75", "930", "09-30", "09:30:00", "", "noon"] {
            assert!(
                normalize_reminder_time(input).is_err(),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_resolve_known_timezones() {
        assert!(resolve_timezone("UTC").is_ok());
        assert!(resolve_timezone("America/New_York").is_ok());
        assert!(resolve_timezone("Europe/Berlin").is_ok());
        assert!(resolve_timezone("Asia/Tokyo").is_ok());
    }

    #[test]
    fn test_resolve_unknown_timezone() {
        let err = resolve_timezone("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, ReminderError::UnknownTimezone(_)));
    }

    #[test]
    fn test_local_minute_new_york_standard_time() {
        let tz = resolve_timezone("America/New_York").unwrap();
        // January: UTC-5
        let instant = Utc.with_ymd_and_hms(2025, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(local_minute(tz, instant), "09:30");
    }

    #[test]
    fn test_local_minute_new_york_daylight_time() {
        let tz = resolve_timezone("America/New_York").unwrap();
        // July: UTC-4
        let instant = Utc.with_ymd_and_hms(2025, 7, 15, 13, 30, 0).unwrap();
        assert_eq!(local_minute(tz, instant), "09:30");
    }

    #[test]
    fn test_local_minute_on_spring_forward_day() {
        let tz = resolve_timezone("America/New_York").unwrap();
        // 2025-03-09: clocks jump from 02:00 EST to 03:00 EDT at 07:00 UTC.
        let before = Utc.with_ymd_and_hms(2025, 3, 9, 6, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 9, 7, 0, 0).unwrap();
        assert_eq!(local_minute(tz, before), "01:59");
        assert_eq!(local_minute(tz, after), "03:00");

        // A 09:30 reminder still fires that day, at the EDT offset.
        let morning = Utc.with_ymd_and_hms(2025, 3, 9, 13, 30, 0).unwrap();
        assert_eq!(local_minute(tz, morning), "09:30");
    }

    #[test]
    fn test_local_stamp_collapses_fall_back_repeat() {
        let tz = resolve_timezone("America/New_York").unwrap();
        // 2025-11-02: 01:30 local occurs twice, once EDT and once EST.
        let first = Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 11, 2, 6, 30, 0).unwrap();
        assert_eq!(local_minute(tz, first), "01:30");
        assert_eq!(local_minute(tz, second), "01:30");
        assert_eq!(local_stamp(tz, first), local_stamp(tz, second));
    }

    #[test]
    fn test_local_minute_is_zero_padded() {
        let tz = resolve_timezone("UTC").unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 6, 1, 7, 5, 0).unwrap();
        assert_eq!(local_minute(tz, instant), "07:05");
    }
}
