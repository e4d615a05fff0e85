//! Comma-delimited line format: `timestamp,key,value`.
//!
//! There is no quoting.  A key containing `,` writes a line with too many
//! fields, which the reader rejects instead of splitting it differently.

use crate::update::{format_timestamp, parse_timestamp, Update, UpdateValue};

use super::{ParseError, UpdateSerializer};

/// CSV codec.
///
/// With `allow_missing_timestamp` set, the two-field form `key,value` is
/// also accepted and yields an update without a timestamp.
#[derive(Debug, Clone, Default)]
pub struct CsvSerializer {
    allow_missing_timestamp: bool,
}

impl CsvSerializer {
    pub fn new(allow_missing_timestamp: bool) -> Self {
        Self {
            allow_missing_timestamp,
        }
    }

    fn parse_value(raw: &str, line: &str) -> Result<UpdateValue, ParseError> {
        UpdateValue::parse(raw).ok_or_else(|| ParseError::InvalidValue {
            value: raw.to_string(),
            line: line.to_string(),
        })
    }

    fn parse_key(raw: &str, line: &str) -> Result<String, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::EmptyKey {
                line: line.to_string(),
            });
        }
        Ok(raw.to_string())
    }
}

impl UpdateSerializer for CsvSerializer {
    fn serialize(&self, update: &Update) -> String {
        match &update.timestamp {
            Some(ts) => format!("{},{},{}", format_timestamp(ts), update.key, update.value),
            None => format!("{},{}", update.key, update.value),
        }
    }

    fn deserialize(&self, line: &str) -> Result<Update, ParseError> {
        let line = line.trim();
        let fields: Vec<&str> = line.split(',').collect();

        match fields.as_slice() {
            [ts, key, value] => {
                let timestamp =
                    parse_timestamp(ts).ok_or_else(|| ParseError::InvalidTimestamp {
                        value: ts.to_string(),
                        line: line.to_string(),
                    })?;
                Ok(Update {
                    timestamp: Some(timestamp),
                    key: Self::parse_key(key, line)?,
                    value: Self::parse_value(value, line)?,
                })
            }
            [key, value] if self.allow_missing_timestamp => Ok(Update {
                timestamp: None,
                key: Self::parse_key(key, line)?,
                value: Self::parse_value(value, line)?,
            }),
            _ => Err(ParseError::InvalidRow {
                line: line.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Update {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(18, 30, 15, 123_456)
            .unwrap();
        Update::new(ts, "distance_total", 1520)
    }

    #[test]
    fn serializes_three_fields() {
        let line = CsvSerializer::default().serialize(&sample());
        assert_eq!(line, "2024-03-01T18:30:15.123456,distance_total,1520");
    }

    #[test]
    fn round_trips_timestamped_updates() {
        let csv = CsvSerializer::default();
        for update in [
            sample(),
            sample().with_value(UpdateValue::Real(3.25)),
            sample().with_value(UpdateValue::Real(10.0)),
            sample().with_value(UpdateValue::Int(-4)),
        ] {
            let parsed = csv.deserialize(&csv.serialize(&update)).unwrap();
            assert_eq!(parsed, update);
            // Variant survives too, not just numeric equality.
            assert_eq!(
                matches!(parsed.value, UpdateValue::Real(_)),
                matches!(update.value, UpdateValue::Real(_))
            );
        }
    }

    #[test]
    fn trailing_newline_is_ignored() {
        let parsed = CsvSerializer::default()
            .deserialize("2024-03-01T18:30:15,speed_instant,5.5\n")
            .unwrap();
        assert_eq!(parsed.key, "speed_instant");
        assert_eq!(parsed.value, UpdateValue::Real(5.5));
    }

    #[test]
    fn two_fields_accepted_when_allowed() {
        let parsed = CsvSerializer::new(true).deserialize("k,5.5").unwrap();
        assert_eq!(parsed.key, "k");
        assert!(matches!(parsed.value, UpdateValue::Real(v) if v == 5.5));
        assert!(parsed.timestamp.is_none());
    }

    #[test]
    fn two_fields_rejected_by_default() {
        let err = CsvSerializer::default().deserialize("k,5.5").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidRow {
                line: "k,5.5".into()
            }
        );
    }

    #[test]
    fn other_field_counts_are_rejected() {
        let csv = CsvSerializer::new(true);
        assert!(matches!(csv.deserialize("only"), Err(ParseError::InvalidRow { .. })));
        assert!(matches!(
            csv.deserialize("a,b,c,d"),
            Err(ParseError::InvalidRow { .. })
        ));
    }

    #[test]
    fn bad_numbers_and_timestamps_are_reported() {
        let csv = CsvSerializer::new(true);
        assert!(matches!(
            csv.deserialize("2024-03-01T18:30:15,k,fast"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            csv.deserialize("noon,k,1"),
            Err(ParseError::InvalidTimestamp { .. })
        ));
        assert!(matches!(csv.deserialize(",1"), Err(ParseError::EmptyKey { .. })));
    }

    #[test]
    fn comma_in_key_is_rejected_on_read() {
        let csv = CsvSerializer::new(true);
        let line = csv.serialize(&Update {
            key: "distance,total".into(),
            ..sample()
        });
        assert!(matches!(csv.deserialize(&line), Err(ParseError::InvalidRow { .. })));

        let untimed = csv.serialize(&Update::untimed("a,b", 1));
        assert!(matches!(
            csv.deserialize(&untimed),
            Err(ParseError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn nanosecond_timestamps_round_trip() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_nano_opt(18, 30, 15, 123_456_789)
            .unwrap();
        let update = Update::new(ts, "time_elapsed", 42);
        let csv = CsvSerializer::default();
        let line = csv.serialize(&update);
        assert_eq!(line, "2024-03-01T18:30:15.123456789,time_elapsed,42");
        assert_eq!(csv.deserialize(&line).unwrap(), update);
    }

    #[test]
    fn untimed_update_serializes_to_two_fields() {
        let line = CsvSerializer::new(true).serialize(&Update::untimed("k", 1));
        assert_eq!(line, "k,1");
    }
}
