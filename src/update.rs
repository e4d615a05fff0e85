//! The measurement record that flows through the whole system.
//!
//! An [`Update`] is a pure message: a producer creates it, the session
//! loop hands it to the interceptor chain, and every stage that wants to
//! change it builds a new one.  Nothing mutates an update in place.

use std::fmt;
use std::ops::Add;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// UpdateValue
// ---------------------------------------------------------------------------

/// Numeric payload of an [`Update`].
///
/// Only two shapes are allowed: a 64-bit signed integer or a double.
/// Equality is numeric, so `Int(5) == Real(5.0)`.
#[derive(Debug, Clone, Copy)]
pub enum UpdateValue {
    Int(i64),
    Real(f64),
}

impl UpdateValue {
    /// Parse a value string using the line-format rule: a string that
    /// contains `.` is a real, anything else an integer.
    ///
    /// ```
    /// use treadmill_monitor::update::UpdateValue;
    ///
    /// assert_eq!(UpdateValue::parse("5.5"), Some(UpdateValue::Real(5.5)));
    /// assert_eq!(UpdateValue::parse("42"), Some(UpdateValue::Int(42)));
    /// assert_eq!(UpdateValue::parse("4x"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.contains('.') {
            text.parse::<f64>().ok().map(UpdateValue::Real)
        } else {
            text.parse::<i64>().ok().map(UpdateValue::Int)
        }
    }

    /// `true` when the value is exactly zero (either variant).
    pub fn is_zero(&self) -> bool {
        match *self {
            UpdateValue::Int(v) => v == 0,
            UpdateValue::Real(v) => v == 0.0,
        }
    }

    /// The value widened to `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            UpdateValue::Int(v) => v as f64,
            UpdateValue::Real(v) => v,
        }
    }

    /// The value as an integer, truncating reals.
    pub fn as_i64(&self) -> i64 {
        match *self {
            UpdateValue::Int(v) => v,
            UpdateValue::Real(v) => v as i64,
        }
    }
}

impl Default for UpdateValue {
    fn default() -> Self {
        UpdateValue::Int(0)
    }
}

impl PartialEq for UpdateValue {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (UpdateValue::Int(a), UpdateValue::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl Add for UpdateValue {
    type Output = UpdateValue;

    /// Integer + integer stays integer (saturating); any real makes a real.
    fn add(self, rhs: UpdateValue) -> UpdateValue {
        match (self, rhs) {
            (UpdateValue::Int(a), UpdateValue::Int(b)) => UpdateValue::Int(a.saturating_add(b)),
            (a, b) => UpdateValue::Real(a.as_f64() + b.as_f64()),
        }
    }
}

impl From<i64> for UpdateValue {
    fn from(v: i64) -> Self {
        UpdateValue::Int(v)
    }
}

impl From<f64> for UpdateValue {
    fn from(v: f64) -> Self {
        UpdateValue::Real(v)
    }
}

impl fmt::Display for UpdateValue {
    /// Reals always carry a `.` so that [`UpdateValue::parse`] restores the
    /// same variant (`10.0`, not `10`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            UpdateValue::Int(v) => write!(f, "{v}"),
            UpdateValue::Real(v) => {
                let text = v.to_string();
                if !v.is_finite() || text.contains('.') || text.contains('e') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// One labelled measurement, e.g. `distance_total = 1520`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// When the measurement was taken.  Absent only for legacy text input
    /// that carries no timestamp column.
    pub timestamp: Option<NaiveDateTime>,
    /// Measurement channel, never empty.  Must not contain `,` or a line
    /// break, or the CSV form cannot be read back.
    pub key: String,
    pub value: UpdateValue,
}

impl Update {
    /// Build a timestamped update.
    pub fn new(timestamp: NaiveDateTime, key: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        Self {
            timestamp: Some(timestamp),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build an update without a timestamp.
    pub fn untimed(key: impl Into<String>, value: impl Into<UpdateValue>) -> Self {
        Self {
            timestamp: None,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Copy of this update carrying `value`; timestamp and key are kept.
    pub fn with_value(&self, value: UpdateValue) -> Self {
        Self {
            timestamp: self.timestamp,
            key: self.key.clone(),
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp text form
// ---------------------------------------------------------------------------

/// Current local wall-clock time, truncated to whole microseconds.
pub fn local_now() -> NaiveDateTime {
    use chrono::Timelike;

    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

/// Format a timestamp as ISO-8601 (`2012-12-21T00:00:00`).
///
/// The fraction is omitted when it is zero, printed as microseconds when
/// that is exact, and as nanoseconds otherwise.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    use chrono::Timelike;

    match ts.nanosecond() {
        0 => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ns if ns % 1_000 == 0 => ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        _ => ts.format("%Y-%m-%dT%H:%M:%S%.9f").to_string(),
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts `T` or a space between date and time, an optional fractional
/// second, and an optional UTC offset (the wall-clock part is kept).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(ts);
        }
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.naive_local())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
