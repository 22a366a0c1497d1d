//! Lenient field deserializers for snapshot rows and ranker options
//!
//! A bad value in one field must not reject the whole pool. Each helper reads
//! the raw value and maps null, negative or wrongly typed input onto `None`
//! (or the type's zero), which the resolver and ranker already treat as
//! missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any finite number, including numeric strings
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// `null` becomes the default, any other shape goes through `T`'s own impl
pub fn null_as_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + Default,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-negative counter; anything else counts as missing
pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value).filter(|v| *v >= 0.0).map(|v| v.floor() as u64))
}

/// Non-negative counter; anything else counts as 0
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_count(deserializer)?.unwrap_or(0))
}

/// Finite metric value; anything else counts as missing
pub fn opt_metric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number(&value))
}

/// Weight or other option value; anything unusable becomes 0
pub fn metric_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_metric(deserializer)?.unwrap_or(0.0))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Non-blank string; numbers, objects and blanks count as missing
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// RFC 3339 timestamp; unparseable values count as missing
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s.trim().parse::<DateTime<Utc>>().ok(),
        _ => None,
    })
}

/// The raw string if the value is one
pub fn opt_raw_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "count")]
        total: u64,
        #[serde(default, deserialize_with = "opt_count")]
        likes: Option<u64>,
        #[serde(default, deserialize_with = "opt_metric")]
        rate: Option<f64>,
        #[serde(default, deserialize_with = "opt_timestamp")]
        at: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "flag")]
        on: bool,
    }

    #[test]
    fn test_bad_values_become_missing() {
        let row: Row = serde_json::from_str(
            r#"{"total": null, "likes": -1, "rate": "fast", "at": "yesterday", "on": 1}"#,
        )
        .unwrap();
        assert_eq!(row.total, 0);
        assert_eq!(row.likes, None);
        assert_eq!(row.rate, None);
        assert_eq!(row.at, None);
        assert!(!row.on);
    }

    #[test]
    fn test_good_values_kept() {
        let row: Row = serde_json::from_str(
            r#"{"total": 12.0, "likes": "7", "rate": 0.25, "at": "2025-01-10T00:00:00Z", "on": true}"#,
        )
        .unwrap();
        assert_eq!(row.total, 12);
        assert_eq!(row.likes, Some(7));
        assert_eq!(row.rate, Some(0.25));
        assert!(row.at.is_some());
        assert!(row.on);
    }
}
