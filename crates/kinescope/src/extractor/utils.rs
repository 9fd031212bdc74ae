use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::extractor::error::ExtractorError;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_or_invalid_url<'a>(
    re: &Regex,
    input: &'a str,
) -> Result<&'a str, ExtractorError> {
    capture_group_1(re, input).ok_or_else(|| ExtractorError::InvalidUrl(input.to_string()))
}

#[inline]
pub fn extras_get_str<'a>(extras: Option<&'a Value>, key: &str) -> Option<&'a str> {
    extras
        .and_then(|e| e.get(key))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Number or numeric string as `f64`. Anything else, including NaN and
/// infinities, is `None`.
pub fn float_or_none(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub fn int_or_none(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"];

/// Parse a date/time string in one of the common page formats into Unix
/// seconds. Times without an offset are taken as UTC.
///
/// ```rust
/// use kinescope_parser::extractor::utils::unified_timestamp;
///
/// assert_eq!(unified_timestamp("2025-10-28T09:26:57Z"), Some(1761643617));
/// assert_eq!(unified_timestamp("2025-10-28T12:26:57+03:00"), Some(1761643617));
/// assert_eq!(unified_timestamp("yesterday"), None);
/// ```
pub fn unified_timestamp(date_str: &str) -> Option<i64> {
    let s = date_str.trim();
    if s.is_empty() {
        return None;
    }

    if s.len() != 8
        && s.bytes().all(|b| b.is_ascii_digit())
        && let Ok(seconds) = s.parse::<i64>()
    {
        return Some(seconds);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // RFC 3339 requires the `T`; pages often use a space instead.
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s.replacen(' ', "T", 1)) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.timestamp());
        }
    }

    let naive = s.trim_end_matches('Z');
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn float_or_none_accepts_numbers_and_numeric_strings() {
        assert_eq!(float_or_none(&json!(16.667)), Some(16.667));
        assert_eq!(float_or_none(&json!(17)), Some(17.0));
        assert_eq!(float_or_none(&json!(" 16.5 ")), Some(16.5));
        assert_eq!(float_or_none(&json!("n/a")), None);
        assert_eq!(float_or_none(&json!("NaN")), None);
        assert_eq!(float_or_none(&json!(null)), None);
        assert_eq!(float_or_none(&json!({"value": 1})), None);
    }

    #[test]
    fn int_or_none_is_strict() {
        assert_eq!(int_or_none("720"), Some(720));
        assert_eq!(int_or_none(" 1280\n"), Some(1280));
        assert_eq!(int_or_none("720.5"), None);
        assert_eq!(int_or_none(""), None);
    }

    #[rstest]
    #[case("2025-10-28T09:26:57Z", Some(1761643617))]
    #[case("2025-10-28T09:26:57.250Z", Some(1761643617))]
    #[case("2025-10-28T12:26:57+03:00", Some(1761643617))]
    #[case("2025-10-28T12:26:57+0300", Some(1761643617))]
    #[case("2025-10-28 09:26:57", Some(1761643617))]
    #[case("2025-10-28T09:26:57", Some(1761643617))]
    #[case("2025-10-28 12:26:57+03:00", Some(1761643617))]
    #[case("Tue, 28 Oct 2025 09:26:57 +0000", Some(1761643617))]
    #[case("2025/10/28 09:26:57", Some(1761643617))]
    #[case("28.10.2025 09:26:57", Some(1761643617))]
    #[case("2025-10-28", Some(1761609600))]
    #[case("20251028", Some(1761609600))]
    #[case("1761643617", Some(1761643617))]
    #[case("", None)]
    #[case("not a date", None)]
    #[case("2025-13-40", None)]
    fn unified_timestamp_cases(#[case] input: &str, #[case] expected: Option<i64>) {
        assert_eq!(unified_timestamp(input), expected);
    }

    #[test]
    fn capture_helpers() {
        let re = Regex::new(r"/v/(\w+)").unwrap();
        assert_eq!(capture_group_1(&re, "https://x/v/abc"), Some("abc"));
        assert!(matches!(
            capture_group_1_or_invalid_url(&re, "https://x/w/abc"),
            Err(ExtractorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn extras_get_str_ignores_empty_and_non_strings() {
        let extras = json!({"referer": "https://a.example/", "empty": "", "n": 1});
        assert_eq!(extras_get_str(Some(&extras), "referer"), Some("https://a.example/"));
        assert_eq!(extras_get_str(Some(&extras), "empty"), None);
        assert_eq!(extras_get_str(Some(&extras), "n"), None);
        assert_eq!(extras_get_str(None, "referer"), None);
    }
}
