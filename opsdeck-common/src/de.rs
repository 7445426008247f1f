//! Lenient deserializers for loosely typed API payloads

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::format::clamp_byte_count;

/// Accept RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC); anything else becomes `None`
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => parse_timestamp(&text),
        _ => None,
    })
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Accept strings or numbers as an identifier label
pub(crate) fn label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(value_label))
}

/// Render a scalar JSON value as a label; `null`, arrays and objects yield `None`
pub(crate) fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Accept any JSON number (or numeric string) as a byte count
pub(crate) fn byte_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let bytes = match raw {
        Some(Value::Number(n)) => n.as_f64().map(clamp_byte_count).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(clamp_byte_count).unwrap_or(0),
        _ => 0,
    };
    Ok(bytes)
}

/// Accept any JSON number (or numeric string) as a non-negative count
pub(crate) fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    byte_count(deserializer)
}

/// Like [`count`], but keeps "absent or unusable" distinct from zero
pub(crate) fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number).map(clamp_byte_count))
}

/// Finite number from a JSON number or numeric string
pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number))
}

/// Hour of day; out-of-range or unusable values become 0
pub(crate) fn hour<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = count(deserializer)?;
    Ok(u32::try_from(raw).ok().filter(|h| *h < 24).unwrap_or(0))
}

/// Scalar rendered as text; anything else becomes an empty string
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(label(deserializer)?.unwrap_or_default())
}

/// Nested object decoded on its own; a non-object or a bad object is `None`
pub(crate) fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Decode each array element independently, dropping the ones that fail
pub(crate) fn skip_invalid<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = raw else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("Skipping malformed entry: {}", e);
                None
            }
        })
        .collect())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2026-03-01T10:15:00Z").unwrap();
        assert_eq!(rfc.hour(), 10);

        let offset = parse_timestamp("2026-03-01T12:15:00+02:00").unwrap();
        assert_eq!(offset, rfc);

        let plain = parse_timestamp("2026-03-01 10:15:00").unwrap();
        assert_eq!(plain, rfc);
        assert_eq!(plain.month(), 3);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_value_label() {
        assert_eq!(value_label(&json!("ISS-7")), Some("ISS-7".to_string()));
        assert_eq!(value_label(&json!(12)), Some("12".to_string()));
        assert_eq!(value_label(&json!(true)), Some("true".to_string()));
        assert_eq!(value_label(&json!(null)), None);
        assert_eq!(value_label(&json!({"a": 1})), None);
    }

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "optional_count")]
        total: Option<u64>,
        #[serde(default, deserialize_with = "optional_number")]
        pct: Option<f64>,
        #[serde(default, deserialize_with = "hour")]
        hour: u32,
        #[serde(default, deserialize_with = "text")]
        name: String,
        #[serde(default, deserialize_with = "skip_invalid")]
        items: Vec<u32>,
    }

    fn decode(value: serde_json::Value) -> Loose {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_optional_numbers_accept_strings() {
        let parsed = decode(json!({"total": "12", "pct": "80.5", "hour": "9"}));
        assert_eq!(parsed.total, Some(12));
        assert_eq!(parsed.pct, Some(80.5));
        assert_eq!(parsed.hour, 9);

        let parsed = decode(json!({"total": "n/a", "pct": [1], "hour": 31}));
        assert_eq!(parsed.total, None);
        assert_eq!(parsed.pct, None);
        assert_eq!(parsed.hour, 0);
    }

    #[test]
    fn test_text_and_missing_fields() {
        assert_eq!(decode(json!({"name": 42})).name, "42");
        assert_eq!(decode(json!({"name": {"x": 1}})).name, "");

        let empty = decode(json!({}));
        assert_eq!(empty.total, None);
        assert_eq!(empty.name, "");
        assert!(empty.items.is_empty());
    }

    #[test]
    fn test_skip_invalid_keeps_good_elements() {
        assert_eq!(decode(json!({"items": [1, "two", 3, -4, 5]})).items, vec![1, 3, 5]);
        assert!(decode(json!({"items": "nope"})).items.is_empty());
    }
}
