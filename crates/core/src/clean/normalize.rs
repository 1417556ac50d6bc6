//! Scalar normalization helpers shared by the cleaners
//!
//! Every parser returns `None` for unparsable input; row-level problems
//! never become errors.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Width of zip-code prefixes
pub const ZIP_WIDTH: usize = 5;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Trim and drop empty values
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Left-pad with `0` to `width` characters; longer values are kept as is
pub fn zero_pad(value: &str, width: usize) -> String {
    let value = value.trim();
    let len = value.chars().count();
    if len >= width {
        value.to_string()
    } else {
        format!("{}{}", "0".repeat(width - len), value)
    }
}

/// Normalize a zip prefix, e.g. `"123"` becomes `"00123"`
pub fn zip_prefix(value: Option<&str>) -> Option<String> {
    non_empty(value).map(|v| zero_pad(v, ZIP_WIDTH))
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Parse a timestamp in UTC
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.f]`, the `T`-separated form, RFC 3339 with
/// any offset, and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = non_empty(value)?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse a value and normalize it to its calendar day
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    parse_timestamp(value).map(|dt| dt.date_naive())
}

/// Parse a finite float
pub fn parse_f64(value: Option<&str>) -> Option<f64> {
    non_empty(value)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse an integer; integral floats such as `"3.0"` are accepted
pub fn parse_i64(value: Option<&str>) -> Option<i64> {
    let value = non_empty(value)?;
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    parse_f64(Some(value))
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Parse a float, treating non-positive values as missing
pub fn parse_positive(value: Option<&str>) -> Option<f64> {
    parse_f64(value).filter(|v| *v > 0.0)
}

/// Trim free text; empty values and the literal `nan` become absent
pub fn clean_text(value: Option<&str>) -> Option<String> {
    non_empty(value)
        .filter(|v| *v != "nan")
        .map(str::to_string)
}

/// Keep the first row for each key, preserving order
pub fn keep_first_by<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

/// Keep the last row for each key, preserving the order of the kept rows
pub fn keep_last_by<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last: HashMap<K, usize> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        last.insert(key(row), index);
    }
    let keep: HashSet<usize> = last.into_values().collect();
    rows.into_iter()
        .enumerate()
        .filter(|(index, _)| keep.contains(index))
        .map(|(_, row)| row)
        .collect()
}

/// Drop exact duplicate rows, keeping the first occurrence
pub fn drop_duplicate_rows<T: Clone + Eq + Hash>(rows: Vec<T>) -> Vec<T> {
    keep_first_by(rows, |row| row.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("123", 5), "00123");
        assert_eq!(zero_pad("01310", 5), "01310");
        assert_eq!(zero_pad("123456", 5), "123456");
        assert_eq!(zip_prefix(Some(" 123 ")).as_deref(), Some("00123"));
        assert_eq!(zip_prefix(Some("")), None);
        assert_eq!(zip_prefix(None), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("sao paulo"), "Sao Paulo");
        assert_eq!(title_case("SÃO PAULO"), "São Paulo");
        assert_eq!(title_case("santa barbara d'oeste"), "Santa Barbara D'Oeste");
        assert_eq!(title_case("rio-de-janeiro"), "Rio-De-Janeiro");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2017, 10, 2).unwrap();
        for input in [
            "2017-10-02 10:56:33",
            "2017-10-02 10:56:33.123",
            "2017-10-02T10:56:33",
            "2017-10-02T10:56:33Z",
            "2017-10-02",
        ] {
            assert_eq!(parse_date(Some(input)), Some(expected), "{input}");
        }
        assert_eq!(parse_date(Some("02/10/2017")), None);
        assert_eq!(parse_date(Some("2017-13-45")), None);
        assert_eq!(parse_date(Some("")), None);
    }

    #[test]
    fn test_parse_timestamp_converts_offset_to_utc() {
        let ts = parse_timestamp(Some("2018-01-01T23:30:00-03:00")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2018-01-02T02:30:00+00:00");
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(parse_f64(Some("12.50")), Some(12.5));
        assert_eq!(parse_f64(Some("abc")), None);
        assert_eq!(parse_f64(Some("NaN")), None);
        assert_eq!(parse_i64(Some("3")), Some(3));
        assert_eq!(parse_i64(Some("3.0")), Some(3));
        assert_eq!(parse_i64(Some("3.5")), None);
        assert_eq!(parse_positive(Some("0")), None);
        assert_eq!(parse_positive(Some("-4")), None);
        assert_eq!(parse_positive(Some("80")), Some(80.0));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  ok ")).as_deref(), Some("ok"));
        assert_eq!(clean_text(Some("nan")), None);
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_keep_first_and_last() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3), ("c", 4), ("b", 5)];
        assert_eq!(
            keep_first_by(rows.clone(), |r| r.0),
            vec![("a", 1), ("b", 2), ("c", 4)]
        );
        assert_eq!(
            keep_last_by(rows, |r| r.0),
            vec![("a", 3), ("c", 4), ("b", 5)]
        );
    }

    #[test]
    fn test_drop_duplicate_rows() {
        let rows = vec![1, 2, 1, 3, 2];
        assert_eq!(drop_duplicate_rows(rows), vec![1, 2, 3]);
    }
}
