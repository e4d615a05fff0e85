//! Append-only CSV log of distinct readings.
//!
//! [`CsvFileLog`] appends `timestamp,key,value` lines to a file, skipping a
//! reading when its value equals the last one written for the same key.
//! Parent directories are created on demand.  [`FileLogInterceptor`] puts
//! the same log into the chain.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::update::{format_timestamp, local_now, Update, UpdateValue};

use super::{ChainError, Interceptor, Next};

/// Source of "now" for stamping log lines.
pub type Clock = fn() -> NaiveDateTime;

/// Coalescing CSV append log.
#[derive(Debug)]
pub struct CsvFileLog {
    path: PathBuf,
    last_written: HashMap<String, UpdateValue>,
    clock: Clock,
}

impl CsvFileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, local_now)
    }

    /// Log stamped by `clock` instead of the local wall clock.
    pub fn with_clock(path: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            path: path.into(),
            last_written: HashMap::new(),
            clock,
        }
    }

    /// Append a reading stamped with the log's clock.
    ///
    /// Returns `Ok(false)` when the value repeats the last one written for
    /// `key` and nothing was appended.
    pub fn record(&mut self, key: &str, value: UpdateValue) -> io::Result<bool> {
        let now = (self.clock)();
        self.record_at(now, key, value)
    }

    /// Append a reading with an explicit timestamp.
    pub fn record_at(&mut self, timestamp: NaiveDateTime, key: &str, value: UpdateValue) -> io::Result<bool> {
        if self.last_written.get(key) == Some(&value) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{},{},{}", format_timestamp(&timestamp), key, value)?;

        self.last_written.insert(key.to_string(), value);
        Ok(true)
    }
}

/// Chain stage around a [`CsvFileLog`].  Uses the update's own timestamp
/// when it has one.
pub struct FileLogInterceptor {
    log: CsvFileLog,
}

impl FileLogInterceptor {
    pub fn new(log: CsvFileLog) -> Self {
        Self { log }
    }
}

impl Interceptor for FileLogInterceptor {
    fn name(&self) -> &'static str {
        "file_log"
    }

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        let timestamp = update.timestamp.unwrap_or_else(self.log.clock);
        self.log.record_at(timestamp, &update.key, update.value)?;
        next.proceed(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::intercept::InterceptorChain;

    fn frozen() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2012, 12, 21)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn writes_frozen_line() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("log.csv");
        let mut log = CsvFileLog::with_clock(&path, frozen);

        assert!(log.record("speed_current", UpdateValue::Real(5.5)).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "2012-12-21T00:00:00,speed_current,5.5\n"
        );
    }

    #[test]
    fn repeated_value_is_written_once() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("log.csv");
        let mut log = CsvFileLog::with_clock(&path, frozen);

        assert!(log.record("speed_instant", UpdateValue::Real(4.0)).unwrap());
        assert!(!log.record("speed_instant", UpdateValue::Real(4.0)).unwrap());
        // Numerically equal counts as a repeat.
        assert!(!log.record("speed_instant", UpdateValue::Int(4)).unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn coalescing_is_per_key() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("log.csv");
        let mut log = CsvFileLog::with_clock(&path, frozen);

        log.record("a", UpdateValue::Int(1)).unwrap();
        log.record("b", UpdateValue::Int(1)).unwrap();
        log.record("a", UpdateValue::Int(2)).unwrap();
        log.record("a", UpdateValue::Int(1)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("deeper").join("log.csv");
        let mut log = CsvFileLog::with_clock(&path, frozen);

        log.record("k", UpdateValue::Int(1)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "earlier\n").unwrap();

        CsvFileLog::with_clock(&path, frozen)
            .record("k", UpdateValue::Int(1))
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("earlier\n"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn interceptor_prefers_update_timestamp() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("log.csv");
        let mut chain = InterceptorChain::new()
            .with(FileLogInterceptor::new(CsvFileLog::with_clock(&path, frozen)));

        let ts = NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap();
        chain.dispatch(Update::new(ts, "energy_total", 12)).unwrap();
        chain.dispatch(Update::untimed("energy_total", 13)).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "2024-02-02T08:15:00,energy_total,12\n2012-12-21T00:00:00,energy_total,13\n"
        );
    }

    #[test]
    fn unwritable_path_is_a_chain_error() {
        let dir = tempdir().expect("temp dir");
        // A directory where the file should be.
        let mut chain = InterceptorChain::new()
            .with(FileLogInterceptor::new(CsvFileLog::with_clock(dir.path(), frozen)));
        let err = chain.dispatch(Update::untimed("k", 1)).unwrap_err();
        assert!(matches!(err, ChainError::Sink(_)));
    }
}
