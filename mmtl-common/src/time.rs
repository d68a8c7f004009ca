//! Timestamp parsing for event times
//!
//! Correlator output and the raw event catalogues write times either as
//! RFC 3339 or as naive `YYYY-MM-DD HH:MM:SS[.fff]` strings, which are
//! interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an event timestamp, returning `None` when no known format matches
///
/// # Examples
///
/// ```
/// use mmtl_common::time::parse_utc_timestamp;
///
/// let t = parse_utc_timestamp("2017-08-17 12:41:04.400").unwrap();
/// assert_eq!(t.to_rfc3339(), "2017-08-17T12:41:04.400+00:00");
/// assert!(parse_utc_timestamp("yesterday").is_none());
/// ```
pub fn parse_utc_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parses_rfc3339_with_offset() {
        let t = parse_utc_timestamp("2019-04-25T10:18:05+02:00").unwrap();
        assert_eq!(t.hour(), 8);
    }

    #[test]
    fn test_parses_naive_without_fraction() {
        let t = parse_utc_timestamp("2015-09-14 09:50:44").unwrap();
        assert_eq!(t.to_rfc3339(), "2015-09-14T09:50:44+00:00");
    }

    #[test]
    fn test_parses_naive_t_separator() {
        assert!(parse_utc_timestamp("2022-10-09T13:16:59.000").is_some());
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(parse_utc_timestamp("").is_none());
        assert!(parse_utc_timestamp("   ").is_none());
        assert!(parse_utc_timestamp("14/09/2015").is_none());
    }
}
