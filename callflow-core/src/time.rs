//! Timestamp parsing and display for board records.
//!
//! Calls and tasks carry their times as strings. Everything that needs an
//! instant (sorting, "next call", rendering) goes through [`parse_timestamp`].

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Naive layouts accepted from the new-call form.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Display layout for rendered times, e.g. `Jan 1, 10:00 AM`.
pub const DISPLAY_FORMAT: &str = "%b %-d, %-I:%M %p";

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a form value. Offset-qualified strings keep their offset; naive
/// wall-clock values are read in `tz`, taking the earlier instant when the
/// local time is ambiguous.
pub fn parse_local_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonical storage form: RFC 3339 in UTC with millisecond precision.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render `raw` in `tz`, or return it unchanged when it cannot be parsed.
pub fn format_display<Tz: TimeZone>(raw: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match parse_timestamp(raw) {
        Some(dt) => dt.with_timezone(tz).format(DISPLAY_FORMAT).to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_and_naive_form_values() {
        let a = parse_timestamp("2024-01-01T10:00:00.000Z").unwrap();
        let b = parse_timestamp("2024-01-01T10:00").unwrap();
        let c = parse_timestamp("2024-01-01T11:00:00+01:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_timestamp("tomorrow-ish").is_none());
    }

    #[test]
    fn test_parse_local_timestamp_reads_naive_in_zone() {
        let ny = chrono_tz::America::New_York;
        let dt = parse_local_timestamp("2024-03-05T10:00", &ny).unwrap();
        assert_eq!(to_iso(&dt), "2024-03-05T15:00:00.000Z");

        let explicit = parse_local_timestamp("2024-03-05T10:00:00Z", &ny).unwrap();
        assert_eq!(to_iso(&explicit), "2024-03-05T10:00:00.000Z");

        // 02:30 does not exist on the spring-forward day.
        assert!(parse_local_timestamp("2024-03-10T02:30", &ny).is_none());
        assert!(parse_local_timestamp("soon", &chrono_tz::UTC).is_none());
    }

    #[test]
    fn test_to_iso_millis() {
        let dt = parse_timestamp("2024-01-01T10:00").unwrap();
        assert_eq!(to_iso(&dt), "2024-01-01T10:00:00.000Z");
    }

    #[test]
    fn test_format_display_in_timezone() {
        assert_eq!(
            format_display("2024-01-01T10:00:00.000Z", &chrono_tz::UTC),
            "Jan 1, 10:00 AM"
        );
        assert_eq!(
            format_display("2024-07-04T18:05:00Z", &chrono_tz::America::New_York),
            "Jul 4, 2:05 PM"
        );
    }

    #[test]
    fn test_format_display_passes_through_garbage() {
        assert_eq!(format_display("not a date", &chrono_tz::UTC), "not a date");
    }
}
