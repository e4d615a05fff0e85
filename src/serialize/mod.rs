//! Line codecs between an [`Update`] and one line of text.
//!
//! Two formats are supported:
//!
//! | Format | Line shape |
//! |--------|------------|
//! | CSV    | `timestamp,key,value` (or `key,value` when allowed) |
//! | JSONL  | `{"ts": "...", "key": "...", "value": 12.5}` |
//!
//! Producers use a serializer to parse incoming lines; the text-sink
//! interceptor uses one to write outgoing lines.

pub mod csv;
pub mod jsonl;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::update::Update;

pub use self::csv::CsvSerializer;
pub use self::jsonl::JsonlSerializer;

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// A line that does not match the expected shape.
///
/// Every variant names the offending line so a skipped input can be
/// found again in the source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid CSV row: {line}")]
    InvalidRow { line: String },

    #[error("invalid timestamp {value:?} in line: {line}")]
    InvalidTimestamp { value: String, line: String },

    #[error("invalid value {value:?} in line: {line}")]
    InvalidValue { value: String, line: String },

    #[error("empty key in line: {line}")]
    EmptyKey { line: String },

    #[error("missing field `{field}` in line: {line}")]
    MissingField { field: &'static str, line: String },

    #[error("invalid JSON data: {line}")]
    InvalidJson { line: String },
}

// ---------------------------------------------------------------------------
// UpdateSerializer trait
// ---------------------------------------------------------------------------

/// Bidirectional codec between an [`Update`] and a single text line.
///
/// Implementors must be `Send + Sync`; one instance is shared between the
/// producer that parses input and the sink that writes output.
pub trait UpdateSerializer: Send + Sync {
    /// Render `update` as one line, without the trailing newline.
    fn serialize(&self, update: &Update) -> String;

    /// Parse one line.  Surrounding whitespace (including the newline) is
    /// ignored.
    fn deserialize(&self, line: &str) -> Result<Update, ParseError>;
}

// ---------------------------------------------------------------------------
// SerializerFormat
// ---------------------------------------------------------------------------

/// Config-level selection of a line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerFormat {
    #[default]
    Csv,
    Jsonl,
}

impl SerializerFormat {
    /// Build the serializer for this format.
    ///
    /// `allow_missing_timestamp` only affects CSV input.
    pub fn build(self, allow_missing_timestamp: bool) -> Arc<dyn UpdateSerializer> {
        match self {
            SerializerFormat::Csv => Arc::new(CsvSerializer::new(allow_missing_timestamp)),
            SerializerFormat::Jsonl => Arc::new(JsonlSerializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_builds_matching_codec() {
        let update = Update::untimed("speed_instant", 5);
        let csv = SerializerFormat::Csv.build(true);
        assert_eq!(csv.serialize(&update), "speed_instant,5");

        let jsonl = SerializerFormat::Jsonl.build(false);
        assert!(jsonl.serialize(&update).starts_with('{'));
    }

    #[test]
    fn format_names_in_toml_are_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: SerializerFormat,
        }
        let parsed: Wrapper = toml::from_str("format = \"jsonl\"").unwrap();
        assert_eq!(parsed.format, SerializerFormat::Jsonl);
    }
}
