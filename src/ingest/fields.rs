//! Tolerant field access over loosely-typed rows.
//!
//! Every logical field resolves through an ordered list of accepted source
//! column names, and every coercion is explicit parse-then-validate
//! returning `Option` — a cell that fails to parse is simply absent.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use crate::config;
use crate::models::Gender;

use super::RawRow;

/// First non-null value among the accepted source names for a field.
pub fn pick<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .find(|value| !value.is_null())
}

/// Scalar rendered as a string: strings pass through, numbers and bools are
/// formatted, arrays/objects are rejected.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trimmed, non-empty string for a field.
pub fn string_field(row: &RawRow, names: &[&str]) -> Option<String> {
    let raw = scalar_string(pick(row, names)?)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Finite numeric coercion: numbers pass through, numeric strings parse;
/// everything else (including NaN/inf) is absent.
pub fn number_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn number_field(row: &RawRow, names: &[&str]) -> Option<f64> {
    number_value(pick(row, names)?)
}

/// Timestamp coercion. Strings try RFC 3339 first, then the common
/// zone-less spreadsheet shapes (assumed UTC — no timezone normalization),
/// then a bare date. Numbers are epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single(),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Raw string plus parsed timestamp for a field, preserving the original
/// cell text for traceability.
pub fn timestamp_field(
    row: &RawRow,
    names: &[&str],
) -> (Option<String>, Option<DateTime<Utc>>) {
    match pick(row, names) {
        Some(value) => (scalar_string(value), parse_timestamp(value)),
        None => (None, None),
    }
}

/// Calendar day of a timestamp as `YYYY-MM-DD`.
pub fn to_day(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

static RE_AGE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s*-\s*(\d{1,3})$").expect("valid regex"));
static RE_AGE_PLUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})\s*\+$").expect("valid regex"));
static RE_AGE_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})$").expect("valid regex"));

/// Numeric age from the shapes age columns actually contain:
/// "23-25" → 24 (real midpoint), "26+" → 26, "30" → 30, numbers pass
/// through. Anything else is absent.
pub fn parse_age(value: &Value) -> Option<f64> {
    if let Value::Number(n) = value {
        let age = n.as_f64()?;
        return age.is_finite().then_some(age);
    }
    let raw = scalar_string(value)?;
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = RE_AGE_RANGE.captures(s) {
        let lo: f64 = caps.get(1)?.as_str().parse().ok()?;
        let hi: f64 = caps.get(2)?.as_str().parse().ok()?;
        return Some((lo + hi) / 2.0);
    }
    if let Some(caps) = RE_AGE_PLUS.captures(s) {
        return caps.get(1)?.as_str().parse().ok();
    }
    if let Some(caps) = RE_AGE_INT.captures(s) {
        return caps.get(1)?.as_str().parse().ok();
    }
    None
}

/// Gender normalization: female/male (with f/m shorthands), empty →
/// unknown, anything else kept verbatim lowercased.
pub fn normalize_gender(value: Option<&Value>) -> Gender {
    let raw = value.and_then(scalar_string).unwrap_or_default();
    let s = raw.trim().to_lowercase();
    match s.as_str() {
        "female" | "f" => Gender::Female,
        "male" | "m" => Gender::Male,
        "" => Gender::Unknown,
        _ => Gender::Other(s),
    }
}

/// Type label: trimmed, empty → the unknown placeholder.
pub fn normalize_type(value: Option<&Value>) -> String {
    let raw = value.and_then(scalar_string).unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        config::UNKNOWN_TYPE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercased email key; empty → absent.
pub fn normalize_email(raw: &str) -> Option<String> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Favorited/interested flag: 1, "1", true, "true".
pub fn truthy_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => {
            let t = s.trim();
            t == "1" || t.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}

/// Embedded JSON object: objects pass through, strings are parsed
/// defensively — malformed JSON is simply absent.
pub fn json_object(value: &Value) -> Option<RawRow> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => {
            let parsed: Value = serde_json::from_str(s).ok()?;
            match parsed {
                Value::Object(map) => Some(map),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pick_skips_nulls_and_respects_order() {
        let mut r = RawRow::new();
        r.insert("createdAt".into(), Value::Null);
        r.insert("created_at".into(), json!("2024-05-01"));
        r.insert("timestamp".into(), json!("1999-01-01"));
        let picked = pick(&r, &["createdAt", "created_at", "timestamp"]).unwrap();
        assert_eq!(picked, &json!("2024-05-01"));
    }

    #[test]
    fn timestamp_accepts_rfc3339_and_spreadsheet_shapes() {
        for raw in [
            "2024-05-01T09:30:00Z",
            "2024-05-01T09:30:00+00:00",
            "2024-05-01 09:30:00",
            "2024-05-01T09:30:00",
            "2024/05/01 09:30:00",
        ] {
            let ts = parse_timestamp(&json!(raw)).unwrap();
            assert_eq!(to_day(&ts), "2024-05-01", "failed for {raw}");
        }
    }

    #[test]
    fn bare_date_parses_to_midnight() {
        let ts = parse_timestamp(&json!("2024-05-01")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T00:00:00+00:00");
    }

    #[test]
    fn epoch_millis_parse() {
        let ts = parse_timestamp(&json!(1_714_553_400_000i64)).unwrap();
        assert_eq!(to_day(&ts), "2024-05-01");
    }

    #[test]
    fn garbage_timestamp_is_absent() {
        assert!(parse_timestamp(&json!("next tuesday")).is_none());
        assert!(parse_timestamp(&json!({"not": "a date"})).is_none());
    }

    #[test]
    fn age_range_takes_real_midpoint() {
        assert_eq!(parse_age(&json!("23-25")), Some(24.0));
        assert_eq!(parse_age(&json!("23-26")), Some(24.5));
        assert_eq!(parse_age(&json!("23 - 25")), Some(24.0));
    }

    #[test]
    fn age_plus_takes_lower_bound() {
        assert_eq!(parse_age(&json!("26+")), Some(26.0));
        assert_eq!(parse_age(&json!("26 +")), Some(26.0));
    }

    #[test]
    fn age_plain_integer_and_number() {
        assert_eq!(parse_age(&json!("30")), Some(30.0));
        assert_eq!(parse_age(&json!(30)), Some(30.0));
    }

    #[test]
    fn age_other_shapes_are_absent() {
        for raw in ["", "thirty", "25-", "-25", "20s", "25+3"] {
            assert_eq!(parse_age(&json!(raw)), None, "failed for {raw:?}");
        }
    }

    #[test]
    fn gender_shorthands_and_verbatim_labels() {
        assert_eq!(normalize_gender(Some(&json!("F"))), Gender::Female);
        assert_eq!(normalize_gender(Some(&json!("male"))), Gender::Male);
        assert_eq!(normalize_gender(Some(&json!("  "))), Gender::Unknown);
        assert_eq!(normalize_gender(None), Gender::Unknown);
        assert_eq!(
            normalize_gender(Some(&json!("Nonbinary"))),
            Gender::Other("nonbinary".into())
        );
    }

    #[test]
    fn type_label_defaults_to_placeholder() {
        assert_eq!(normalize_type(Some(&json!("  INTJ "))), "INTJ");
        assert_eq!(normalize_type(Some(&json!(""))), "(unknown)");
        assert_eq!(normalize_type(None), "(unknown)");
    }

    #[test]
    fn email_lowercases_and_drops_empty() {
        assert_eq!(normalize_email(" A@X.com "), Some("a@x.com".into()));
        assert_eq!(normalize_email("   "), None);
    }

    #[test]
    fn truthy_flag_accepts_one_and_true() {
        assert!(truthy_flag(Some(&json!(1))));
        assert!(truthy_flag(Some(&json!("1"))));
        assert!(truthy_flag(Some(&json!(true))));
        assert!(truthy_flag(Some(&json!("true"))));
        assert!(!truthy_flag(Some(&json!(0))));
        assert!(!truthy_flag(Some(&json!("yes"))));
        assert!(!truthy_flag(None));
    }

    #[test]
    fn json_object_parses_strings_defensively() {
        let obj = json_object(&json!({"a": 1})).unwrap();
        assert_eq!(obj.get("a"), Some(&json!(1)));

        let parsed = json_object(&json!("{\"b\": 2}")).unwrap();
        assert_eq!(parsed.get("b"), Some(&json!(2)));

        assert!(json_object(&json!("{broken")).is_none());
        assert!(json_object(&json!("[1,2]")).is_none());
        assert!(json_object(&json!(42)).is_none());
    }

    #[test]
    fn number_coercion_rejects_non_finite() {
        assert_eq!(number_value(&json!("42.5")), Some(42.5));
        assert_eq!(number_value(&json!(7)), Some(7.0));
        assert_eq!(number_value(&json!("NaN")), None);
        assert_eq!(number_value(&json!("inf")), None);
        assert_eq!(number_value(&json!("abc")), None);
    }
}
