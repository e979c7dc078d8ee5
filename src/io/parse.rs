//! Parsing of portal-formatted values.
//!
//! The portal formats prices for display (`"15,800"`, `"( - )"`) and names
//! the per-day columns of its ranged tables `DD/MM/YYYY`. Everything here
//! returns `Option`: an unusable value is "no value", never zero and never an
//! error.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;

/// Placeholders the portal prints where it has no observation.
const SENTINELS: [&str; 4] = ["", "-", "( - )", "(-)"];

static DATE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("date column pattern is valid"));

/// Parse a display-formatted number such as `"15,800"` or `" 14 450 "`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if SENTINELS.contains(&trimmed) {
        return None;
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Parse a JSON cell that may hold either a number or a formatted string.
pub fn parse_price_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_price(s),
        _ => None,
    }
}

/// Whether a row key names a per-day column.
///
/// Rows also carry metadata keys (`no`, `name`, `level`) that must never be
/// read as dates.
pub fn is_date_column(key: &str) -> bool {
    DATE_COLUMN.is_match(key)
}

/// Parse a `DD/MM/YYYY` column header into a calendar date.
pub fn parse_date_column(key: &str) -> Option<NaiveDate> {
    if !is_date_column(key) {
        return None;
    }
    NaiveDate::parse_from_str(key, "%d/%m/%Y").ok()
}

/// Read an integer id that the portal may send as a number or a string.
pub fn parse_id(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentinels_are_no_value() {
        for s in ["", "-", "( - )", "(-)", "   ", " - "] {
            assert_eq!(parse_price(s), None, "sentinel {s:?}");
        }
    }

    #[test]
    fn thousands_separators_are_removed() {
        assert_eq!(parse_price("15,800"), Some(15_800.0));
        assert_eq!(parse_price("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_price(" 14 450 "), Some(14_450.0));
        assert_eq!(parse_price("28000"), Some(28_000.0));
    }

    #[test]
    fn digit_groups_concatenate() {
        for (a, b) in [(1u32, 0u32), (15, 800), (999, 999), (3, 50)] {
            let s = format!("{a},{b}");
            let expected: f64 = format!("{a}{b}").parse().unwrap();
            assert_eq!(parse_price(&s), Some(expected));
        }
    }

    #[test]
    fn residue_is_no_value() {
        assert_eq!(parse_price("Rp 15.000,-"), None);
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_price("inf"), None);
        assert_eq!(parse_price("NaN"), None);
    }

    #[test]
    fn json_cells() {
        assert_eq!(parse_price_value(&json!(28000)), Some(28_000.0));
        assert_eq!(parse_price_value(&json!(12.5)), Some(12.5));
        assert_eq!(parse_price_value(&json!("15,800")), Some(15_800.0));
        assert_eq!(parse_price_value(&json!("-")), None);
        assert_eq!(parse_price_value(&Value::Null), None);
        assert_eq!(parse_price_value(&json!(true)), None);
    }

    #[test]
    fn date_columns() {
        assert!(is_date_column("27/02/2026"));
        assert!(!is_date_column("no"));
        assert!(!is_date_column("level"));
        assert!(!is_date_column("2026-02-27"));
        assert!(!is_date_column("27/02/2026x"));
        assert_eq!(
            parse_date_column("27/02/2026"),
            NaiveDate::from_ymd_opt(2026, 2, 27)
        );
        assert_eq!(parse_date_column("31/02/2026"), None);
        assert_eq!(parse_date_column("name"), None);
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        assert_eq!(parse_id(&json!(13)), Some(13));
        assert_eq!(parse_id(&json!(" 13 ")), Some(13));
        assert_eq!(parse_id(&json!(-1)), None);
        assert_eq!(parse_id(&json!("x")), None);
    }
}
