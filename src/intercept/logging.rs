//! Logs every update at a fixed level and forwards it untouched.

use crate::update::Update;

use super::{ChainError, Interceptor, Next};

pub struct LoggingInterceptor {
    level: log::Level,
}

impl LoggingInterceptor {
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }

    /// Parse a level name such as `"debug"` or `"INFO"`; unknown names fall
    /// back to debug.
    pub fn from_level_name(name: &str) -> Self {
        let level = name.parse().unwrap_or_else(|_| {
            log::warn!("unknown log level {name:?}, using debug");
            log::Level::Debug
        });
        Self::new(level)
    }

    pub fn level(&self) -> log::Level {
        self.level
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new(log::Level::Debug)
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn intercept(&mut self, update: Update, next: Next<'_>) -> Result<(), ChainError> {
        log::log!(self.level, "treadmill update: {} = {}", update.key, update.value);
        next.proceed(update)
    }
}
