//! Display helpers shared by every view.
//!
//! The backend writes timestamps as epoch milliseconds (sometimes as a
//! numeric string) or RFC 3339, and marks unknown values with sentinel
//! strings. These helpers turn both into something printable.

use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use serde_json::Value;

use crate::model::Reading;

/// Printed when a timestamp cannot be interpreted.
pub const NOT_AVAILABLE: &str = "n/a";

/// Strings the backend uses for "value not known".
pub const UNKNOWN_SENTINELS: [&str; 2] = ["NOT_FOUND", "DEFAULT"];

/// `true` for `null` and the backend's unknown sentinel strings.
///
/// Falsy values that are real data (`""`, `0`, `false`) are not sentinels.
pub fn is_unknown_sentinel(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_sentinel_str(s),
        _ => false,
    }
}

pub fn is_sentinel_str(s: &str) -> bool {
    UNKNOWN_SENTINELS.contains(&s)
}

/// Interpret a raw timestamp: epoch millis (number or numeric string)
/// or an RFC 3339 string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(millis) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Human-relative rendering of a raw timestamp ("3 hours ago").
/// Returns [`NOT_AVAILABLE`] when the input is not a valid date.
pub fn format_relative_time(value: &Value) -> String {
    parse_timestamp(value).map_or_else(|| NOT_AVAILABLE.to_owned(), |ts| relative_to(ts, Utc::now()))
}

/// Relative rendering of `ts` as seen from `now`.
pub fn relative_to(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    HumanTime::from(ts.signed_duration_since(now)).to_string()
}

/// Table cell for a reading: the value, or `-` when unknown.
pub fn display_or_dash<T: std::fmt::Display>(reading: &Reading<T>) -> String {
    reading.to_string()
}

/// Table cell for a timestamp reading: relative time, or `-`.
pub fn relative_or_dash(reading: &Reading<DateTime<Utc>>) -> String {
    match reading {
        Reading::Known(ts) => relative_to(*ts, Utc::now()),
        Reading::Unknown => "-".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn sentinels() {
        assert!(is_unknown_sentinel(&json!("NOT_FOUND")));
        assert!(is_unknown_sentinel(&json!("DEFAULT")));
        assert!(is_unknown_sentinel(&Value::Null));
    }

    #[test]
    fn falsy_values_are_not_sentinels() {
        assert!(!is_unknown_sentinel(&json!("")));
        assert!(!is_unknown_sentinel(&json!(0)));
        assert!(!is_unknown_sentinel(&json!(false)));
        assert!(!is_unknown_sentinel(&json!("not_found")));
    }

    #[test]
    fn invalid_dates_are_not_available() {
        assert_eq!(format_relative_time(&json!("not-a-date")), "n/a");
        assert_eq!(format_relative_time(&Value::Null), "n/a");
        assert_eq!(format_relative_time(&json!({ "at": 1 })), "n/a");
    }

    #[test]
    fn past_timestamp_renders_relative() {
        let three_hours_ago = Utc::now() - Duration::hours(3);
        let millis = three_hours_ago.timestamp_millis();

        let from_number = format_relative_time(&json!(millis));
        assert!(!from_number.is_empty());
        assert_ne!(from_number, "n/a");
        assert!(from_number.ends_with("ago"), "got {from_number}");

        let from_string = format_relative_time(&json!(millis.to_string()));
        assert_eq!(from_string, from_number);
    }

    #[test]
    fn rfc3339_is_accepted() {
        let ts = parse_timestamp(&json!("2020-04-29T18:12:12.000Z")).map(|t| t.timestamp());
        assert_eq!(ts, Some(1_588_183_932));
    }

    #[test]
    fn relative_to_fixed_now() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        assert_eq!(relative_to(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(relative_to(now + Duration::days(2), now), "in 2 days");
    }

    #[test]
    fn dash_for_unknown_cells() {
        assert_eq!(display_or_dash(&Reading::Known(7)), "7");
        assert_eq!(display_or_dash::<u32>(&Reading::Unknown), "-");
        assert_eq!(relative_or_dash(&Reading::Unknown), "-");
    }
}
