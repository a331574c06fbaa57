//! Date parsing and range helpers.

use crate::types::DateKey;
use chrono::{Datelike, NaiveDate};

/// Parse an upstream date string into a [`DateKey`].
///
/// Accepts:
/// - YYYY-MM-DD
/// - RFC3339 datetime (date part in its own offset)
/// - Naive datetime YYYY-MM-DDTHH:MM:SS
pub fn parse_date_key(s: &str) -> Option<DateKey> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.into());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive().into());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date().into());
    }
    None
}

/// Every calendar day in the inclusive range, ascending. Empty if `start > end`.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<DateKey> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(DateKey::from)
        .collect()
}

/// Query pairs describing an inclusive daily range in the performance API's
/// `dailyRange.*` convention.
pub fn daily_range_query(start: NaiveDate, end: NaiveDate) -> Vec<(String, String)> {
    vec![
        ("dailyRange.start_date.year".into(), start.year().to_string()),
        ("dailyRange.start_date.month".into(), start.month().to_string()),
        ("dailyRange.start_date.day".into(), start.day().to_string()),
        ("dailyRange.end_date.year".into(), end.year().to_string()),
        ("dailyRange.end_date.month".into(), end.month().to_string()),
        ("dailyRange.end_date.day".into(), end.day().to_string()),
    ]
}

/// Resource path for a location; accepts either `123` or `locations/123`.
pub fn location_resource(location_id: &str) -> String {
    let id = location_id
        .trim()
        .trim_start_matches('/')
        .trim_start_matches("locations/");
    format!("locations/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_key_accepts_date_only() {
        assert_eq!(parse_date_key("2025-12-15"), Some(DateKey::new(2025, 12, 15)));
    }

    #[test]
    fn parse_date_key_accepts_rfc3339() {
        assert_eq!(
            parse_date_key("2025-12-15T10:30:00Z"),
            Some(DateKey::new(2025, 12, 15))
        );
    }

    #[test]
    fn parse_date_key_accepts_naive_datetime() {
        assert_eq!(
            parse_date_key("2025-12-15T23:59:59"),
            Some(DateKey::new(2025, 12, 15))
        );
    }

    #[test]
    fn parse_date_key_rejects_invalid() {
        assert!(parse_date_key("not-a-date").is_none());
    }

    #[test]
    fn days_in_range_is_inclusive_and_crosses_months() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let days = days_in_range(start, end);
        assert_eq!(days.len(), 5);
        assert_eq!(days[2], DateKey::new(2024, 2, 29));
        assert_eq!(days[4], DateKey::new(2024, 3, 2));
        assert!(days_in_range(end, start).is_empty());
    }

    #[test]
    fn location_resource_normalizes_prefix() {
        assert_eq!(location_resource("123"), "locations/123");
        assert_eq!(location_resource("locations/123"), "locations/123");
    }
}
