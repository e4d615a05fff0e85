//! Human-readable rendering of treadmill readings.
//!
//! Units follow the FTMS characteristic: elapsed time in seconds, distance
//! in tenths of a metre, energy in tenths of a kilocalorie, speed in km/h.

use crate::update::UpdateValue;

/// Colour class of the training-status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// No status received yet, or an unknown code.
    Neutral,
    Warning,
    Error,
    Success,
}

/// FTMS training-status names, indexed by code.
const TRAINING_STATUS: [&str; 16] = [
    "Other",
    "Idle",
    "Warming Up",
    "Low Intensity Interval",
    "High Intensity Interval",
    "Recovery Interval",
    "Isometric",
    "Heart Rate Control",
    "Fitness Test",
    "Speed Too Low",
    "Speed Too High",
    "Cool Down",
    "Watt Control",
    "Manual Mode",
    "Pre-Workout",
    "Post-Workout",
];

pub fn training_status_name(code: i64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|i| TRAINING_STATUS.get(i).copied())
        .unwrap_or("Unknown")
}

pub fn training_status_tone(code: i64) -> StatusTone {
    match code {
        1 => StatusTone::Error,
        0 | 2 | 9 | 10 | 14 | 15 => StatusTone::Warning,
        3..=8 | 11..=13 => StatusTone::Success,
        _ => StatusTone::Neutral,
    }
}

/// `HH:MM:SS`, wrapping at 24 hours.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.rem_euclid(24 * 3600);
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// One decimal, km/h.
pub fn format_speed(value: UpdateValue) -> String {
    format!("{:.1}", value.as_f64())
}

/// Tenths of a metre to kilometres, two decimals.
pub fn format_distance_km(value: UpdateValue) -> String {
    format!("{:.2}", value.as_f64() / 10_000.0)
}

/// Tenths of a kilocalorie to whole kilocalories, rounded down.
pub fn format_energy_kcal(value: UpdateValue) -> String {
    format!("{}", (value.as_f64() / 10.0).floor() as i64)
}

/// Render any reading for the stats panel.  Unknown keys print the raw
/// value.
pub fn format_stat(key: &str, value: UpdateValue) -> String {
    match key {
        "training_status" => training_status_name(value.as_i64()).to_string(),
        "time_elapsed" => format_elapsed(value.as_f64().floor() as i64),
        "speed_instant" => format_speed(value),
        "distance_total" => format_distance_km(value),
        "energy_total" => format_energy_kcal(value),
        _ => value.to_string(),
    }
}
