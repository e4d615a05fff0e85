//! Resumable accumulation: keeps running totals alive across machine resets.
//!
//! Treadmills report cumulative channels (elapsed time, distance, energy)
//! that fall back to zero whenever a workout is stopped.  This stage keeps,
//! per tracked key, the last raw value of the workout in progress
//! (`active`) and the sum of every finished workout (`accumulated`), and
//! forwards `raw + accumulated` instead of the raw value.
//!
//! A reset is recognised only when the raw value is exactly zero *and* a
//! workout was already active for that key.  The very first zero merely
//! starts tracking.
//!
//! ```text
//! raw:       0   10    0   10    0
//! active:    0   10    0   10    0
//! accum:     -    -   10   10   20
//! forwarded: 0   10   10   20   20
//! ```

use std::collections::{HashMap, HashSet};

use crate::update::{Update, UpdateValue};

use super::{ChainError, Interceptor, Next};

/// Keys accumulated when the config does not list any.
pub const DEFAULT_ACCUMULATE_KEYS: [&str; 3] = ["time_elapsed", "distance_total", "energy_total"];

/// Owns the accumulation state for one session.
#[derive(Debug, Default)]
pub struct ResumableInterceptor {
    keys: HashSet<String>,
    active: HashMap<String, UpdateValue>,
    accumulated: HashMap<String, UpdateValue>,
}

impl ResumableInterceptor {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            active: HashMap::new(),
            accumulated: HashMap::new(),
        }
    }

    /// Track [`DEFAULT_ACCUMULATE_KEYS`].
    pub fn with_default_keys() -> Self {
        Self::new(DEFAULT_ACCUMULATE_KEYS)
    }

    pub fn tracks(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Last raw value of the workout in progress for `key`.
    pub fn active(&self, key: &str) -> Option<UpdateValue> {
        self.active.get(key).copied()
    }

    /// Sum of all finished workouts for `key`.
    pub fn accumulated(&self, key: &str) -> Option<UpdateValue> {
        self.accumulated.get(key).copied()
    }

    /// Apply the reset-detection rule and return the update to forward.
    ///
    /// Untracked keys come back unchanged and leave no state behind.
    pub fn resume(&mut self, update: Update) -> Update {
        if !self.tracks(&update.key) {
            return update;
        }

        let raw = update.value;
        if raw.is_zero() {
            if let Some(last) = self.active.remove(&update.key) {
                let total = self
                    .accumulated
                    .entry(update.key.clone())
                    .or_default();
                *total = *total + last;
                log::info!(
                    "detected reset for '{}'; accumulated value is now {}",
                    update.key,
                    total
                );
            }
        }

        self.active.insert(update.key.clone(), raw);
        let offset = self.accumulated(&update.key).unwrap_or_default();
        update.with_value(raw + offset)
    }
}

impl Interceptor for ResumableInterceptor {
    fn name(&self) -> &'static str {
        "resumable"
    }

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        let resumed = self.resume(update);
        next.proceed(resumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn feed(resumable: &mut ResumableInterceptor, key: &str, raws: &[i64]) -> Vec<i64> {
        raws.iter()
            .map(|&raw| resumable.resume(Update::untimed(key, raw)).value.as_i64())
            .collect()
    }

    #[test]
    fn elapsed_time_survives_resets() {
        let mut resumable = ResumableInterceptor::with_default_keys();
        assert_eq!(
            feed(&mut resumable, "time_elapsed", &[0, 10, 0, 10, 0]),
            vec![0, 10, 10, 20, 20]
        );
        assert_eq!(resumable.accumulated("time_elapsed"), Some(UpdateValue::Int(20)));
        assert_eq!(resumable.active("time_elapsed"), Some(UpdateValue::Int(0)));
    }

    #[test]
    fn first_zero_only_seeds_active() {
        let mut resumable = ResumableInterceptor::with_default_keys();
        let out = resumable.resume(Update::untimed("distance_total", 0));
        assert_eq!(out.value, UpdateValue::Int(0));
        assert_eq!(resumable.active("distance_total"), Some(UpdateValue::Int(0)));
        assert!(resumable.accumulated("distance_total").is_none());
    }

    #[test]
    fn untracked_keys_pass_through_without_state() {
        let mut resumable = ResumableInterceptor::with_default_keys();
        assert_eq!(feed(&mut resumable, "speed_instant", &[5, 0, 3]), vec![5, 0, 3]);
        assert!(resumable.active("speed_instant").is_none());
        assert!(resumable.accumulated("speed_instant").is_none());
    }

    #[test]
    fn only_exact_zero_is_a_reset() {
        let mut resumable = ResumableInterceptor::new(["energy_total"]);
        // A drop to a non-zero value is not treated as a reset.
        assert_eq!(
            feed(&mut resumable, "energy_total", &[50, 80, 3, 10]),
            vec![50, 80, 3, 10]
        );
        assert!(resumable.accumulated("energy_total").is_none());
    }

    #[test]
    fn output_is_monotonic_across_many_workouts() {
        let mut resumable = ResumableInterceptor::with_default_keys();
        let workouts: [&[i64]; 4] = [&[0, 5, 9, 14], &[0, 1, 2], &[0, 30], &[0, 0, 7]];

        let mut previous = i64::MIN;
        let mut expected_total = 0;
        for workout in workouts {
            for &raw in workout {
                let out = resumable.resume(Update::untimed("distance_total", raw)).value.as_i64();
                assert!(out >= previous, "{out} < {previous}");
                previous = out;
            }
            expected_total += workout.last().copied().unwrap_or(0);
        }
        assert_eq!(previous, expected_total);
    }

    #[test]
    fn keys_are_accumulated_independently() {
        let mut resumable = ResumableInterceptor::with_default_keys();
        feed(&mut resumable, "time_elapsed", &[0, 60, 0]);
        assert_eq!(feed(&mut resumable, "distance_total", &[0, 100]), vec![0, 100]);
        assert_eq!(feed(&mut resumable, "time_elapsed", &[5]), vec![65]);
    }

    #[test]
    fn real_values_accumulate_as_reals() {
        let mut resumable = ResumableInterceptor::new(["distance_total"]);
        resumable.resume(Update::untimed("distance_total", 1.5));
        resumable.resume(Update::untimed("distance_total", 0.0));
        let out = resumable.resume(Update::untimed("distance_total", 2.0));
        assert!(matches!(out.value, UpdateValue::Real(v) if (v - 3.5).abs() < 1e-9));
    }

    #[test]
    fn forwarded_copy_keeps_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let mut resumable = ResumableInterceptor::with_default_keys();
        resumable.resume(Update::new(ts, "time_elapsed", 10));
        resumable.resume(Update::new(ts, "time_elapsed", 0));
        let out = resumable.resume(Update::new(ts, "time_elapsed", 3));
        assert_eq!(out.timestamp, Some(ts));
        assert_eq!(out.value, UpdateValue::Int(13));
    }
}
