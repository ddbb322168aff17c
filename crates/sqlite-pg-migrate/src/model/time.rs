//! Timestamp parsing for source text columns.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Parse a timestamp as stored in the source database.
///
/// The canonical form is `2021-06-16 20:14:09.221838+00`: space-separated,
/// microsecond fraction, two-digit UTC offset without minutes. Fractions are
/// optional, as are the offset minutes. RFC 3339 strings are accepted as a
/// fallback, and a timestamp with no offset at all is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    // %#z accepts "+00" where %z would demand "+0000".
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

    for format in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_short_utc_offset() {
        let dt = parse_timestamp("2021-06-16 20:14:09.221838+00").unwrap();
        assert_eq!(dt.timestamp_subsec_micros(), 221838);
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_parses_without_fraction() {
        let dt = parse_timestamp("2021-06-16 20:14:09+00").unwrap();
        assert_eq!(dt.timestamp_subsec_micros(), 0);
    }

    #[test]
    fn test_parses_rfc3339() {
        let dt = parse_timestamp("2021-06-16T20:14:09.221838+00:00").unwrap();
        assert_eq!(dt, parse_timestamp("2021-06-16 20:14:09.221838+00").unwrap());
    }

    #[test]
    fn test_offset_forms_compare_as_same_instant() {
        let short = parse_timestamp("2021-06-16 20:14:09.221838+00").unwrap();
        let long = parse_timestamp("2021-06-16 23:14:09.221838+03:00").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_naive_timestamp_assumed_utc() {
        let dt = parse_timestamp("2021-06-16 20:14:09.221838").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp("not a timestamp").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
