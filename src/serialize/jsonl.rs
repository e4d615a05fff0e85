//! JSON-lines format: one `{"ts", "key", "value"}` object per line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::update::{format_timestamp, parse_timestamp, Update, UpdateValue};

use super::{ParseError, UpdateSerializer};

/// JSONL codec.
///
/// `value` may be written as a JSON number or a numeric string; either way
/// it is coerced to text and parsed with the usual dot rule.  Reals whose
/// JSON number form would lose the `.` (`1e20`) are written as strings.
/// Non-finite reals have no text form that parses back and are not
/// supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlSerializer;

#[derive(Serialize)]
struct RecordOut<'a> {
    ts: Option<String>,
    key: &'a str,
    value: Value,
}

#[derive(Deserialize)]
struct RecordIn {
    ts: Option<Value>,
    key: Option<Value>,
    value: Option<Value>,
}

fn value_to_json(value: UpdateValue) -> Value {
    match value {
        UpdateValue::Int(v) => Value::from(v),
        UpdateValue::Real(v) => match serde_json::Number::from_f64(v) {
            Some(n) if n.to_string().contains('.') => Value::Number(n),
            _ => Value::String(value.to_string()),
        },
    }
}

/// Coerce a JSON scalar to the text the dot rule parses.
fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl UpdateSerializer for JsonlSerializer {
    fn serialize(&self, update: &Update) -> String {
        let record = RecordOut {
            ts: update.timestamp.as_ref().map(format_timestamp),
            key: &update.key,
            value: value_to_json(update.value),
        };
        // Serializing a struct of strings and numbers cannot fail.
        serde_json::to_string(&record).unwrap_or_default()
    }

    fn deserialize(&self, line: &str) -> Result<Update, ParseError> {
        let line = line.trim();
        let record: RecordIn = serde_json::from_str(line).map_err(|_| ParseError::InvalidJson {
            line: line.to_string(),
        })?;

        let missing = |field: &'static str| ParseError::MissingField {
            field,
            line: line.to_string(),
        };

        let ts_text = match record.ts {
            Some(Value::String(s)) => s,
            _ => return Err(missing("ts")),
        };
        let key = match record.key {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::String(_)) => {
                return Err(ParseError::EmptyKey {
                    line: line.to_string(),
                })
            }
            _ => return Err(missing("key")),
        };
        let raw_value = match record.value {
            Some(Value::Null) | None => return Err(missing("value")),
            Some(v) => json_to_text(&v),
        };

        let timestamp = parse_timestamp(&ts_text).ok_or_else(|| ParseError::InvalidTimestamp {
            value: ts_text.clone(),
            line: line.to_string(),
        })?;
        let value = UpdateValue::parse(&raw_value).ok_or_else(|| ParseError::InvalidValue {
            value: raw_value.clone(),
            line: line.to_string(),
        })?;

        Ok(Update {
            timestamp: Some(timestamp),
            key,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Update {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(18, 30, 15)
            .unwrap();
        Update::new(ts, "speed_instant", 5.5)
    }

    #[test]
    fn writes_ts_key_value_fields() {
        let line = JsonlSerializer.serialize(&sample());
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["ts"], "2024-03-01T18:30:15");
        assert_eq!(parsed["key"], "speed_instant");
        assert_eq!(parsed["value"], 5.5);
        assert!(!line.contains('\n'));
    }

    #[test]
    fn round_trips() {
        for update in [sample(), sample().with_value(UpdateValue::Int(12))] {
            let parsed = JsonlSerializer
                .deserialize(&JsonlSerializer.serialize(&update))
                .unwrap();
            assert_eq!(parsed, update);
        }
    }

    #[test]
    fn exponent_sized_reals_stay_real() {
        for v in [1e20, 1e-7, -3.5e300] {
            let update = sample().with_value(UpdateValue::Real(v));
            let line = JsonlSerializer.serialize(&update);
            let parsed = JsonlSerializer.deserialize(&line).unwrap();
            assert!(matches!(parsed.value, UpdateValue::Real(r) if r == v), "{line}");
        }
    }

    #[test]
    fn accepts_numeric_strings() {
        let parsed = JsonlSerializer
            .deserialize(r#"{"ts": "2024-03-01T18:30:15", "key": "energy_total", "value": "42"}"#)
            .unwrap();
        assert!(matches!(parsed.value, UpdateValue::Int(42)));

        let parsed = JsonlSerializer
            .deserialize(r#"{"ts": "2024-03-01T18:30:15", "key": "k", "value": "4.5"}"#)
            .unwrap();
        assert!(matches!(parsed.value, UpdateValue::Real(v) if v == 4.5));
    }

    #[test]
    fn whole_json_reals_stay_real() {
        let parsed = JsonlSerializer
            .deserialize(r#"{"ts": "2024-03-01T18:30:15", "key": "k", "value": 10.0}"#)
            .unwrap();
        assert!(matches!(parsed.value, UpdateValue::Real(_)));
    }

    #[test]
    fn missing_fields_name_the_line() {
        let line = r#"{"key": "k", "value": 1}"#;
        let err = JsonlSerializer.deserialize(line).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                field: "ts",
                line: line.to_string()
            }
        );
        assert!(err.to_string().contains(line));

        assert!(matches!(
            JsonlSerializer.deserialize(r#"{"ts": "2024-03-01T18:30:15", "value": 1}"#),
            Err(ParseError::MissingField { field: "key", .. })
        ));
        assert!(matches!(
            JsonlSerializer.deserialize(r#"{"ts": "2024-03-01T18:30:15", "key": "k"}"#),
            Err(ParseError::MissingField { field: "value", .. })
        ));
    }

    #[test]
    fn garbage_is_invalid_json() {
        assert!(matches!(
            JsonlSerializer.deserialize("not json"),
            Err(ParseError::InvalidJson { .. })
        ));
        assert!(matches!(
            JsonlSerializer.deserialize(r#"{"ts": "2024-03-01T18:30:15", "key": "k", "value": true}"#),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn untimed_update_writes_null_ts() {
        let line = JsonlSerializer.serialize(&Update::untimed("k", 1));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed["ts"].is_null());
        assert!(JsonlSerializer.deserialize(&line).is_err());
    }
}
