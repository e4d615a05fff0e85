//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a file that names only the
//! fields it cares about still loads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::intercept::DEFAULT_ACCUMULATE_KEYS;
use crate::queue::DEFAULT_CAPACITY;
use crate::serialize::SerializerFormat;

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Where updates come from.
///
/// | Variant  | Producer                               |
/// |----------|----------------------------------------|
/// | Stdin    | text lines on standard input           |
/// | File     | text lines replayed from `input.file`  |
/// | Device   | a fitness machine (see `[device]`)     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    #[default]
    Stdin,
    File,
    Device,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub source: InputSource,
    /// File replayed when `source = "file"`.
    pub file: Option<PathBuf>,
    /// Line format of text input.
    pub format: SerializerFormat,
    /// Accept CSV rows of the form `key,value`.
    pub allow_missing_timestamp: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: InputSource::default(),
            file: None,
            format: SerializerFormat::default(),
            allow_missing_timestamp: false,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Settings for the device producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Hardware address to connect to.  `None` scans for the fitness-machine
    /// service and takes the first device found.
    pub address: Option<String>,
    /// Use the built-in simulated treadmill.
    pub simulate: bool,
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Text outputs of the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write every post-chain update to stdout.
    pub stdout: bool,
    /// Line format of the stdout sink.
    pub format: SerializerFormat,
    /// Append-only CSV log; consecutive duplicates per key are coalesced.
    pub log_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stdout: false,
            format: SerializerFormat::default(),
            log_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Consumer-loop and chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Carry totals across device resets.
    pub resumable: bool,
    /// Keys whose values are accumulated when `resumable` is on.
    pub accumulate_keys: Vec<String>,
    /// Upper bound on one wait for the next update, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of undelivered updates.
    pub queue_capacity: usize,
    /// Level of the per-update log line (`"trace"` … `"error"`).
    pub log_level: String,
    /// Turn on debug logging for the whole process.
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            resumable: false,
            accumulate_keys: DEFAULT_ACCUMULATE_KEYS.iter().map(|k| k.to_string()).collect(),
            poll_interval_ms: 1_000,
            queue_capacity: DEFAULT_CAPACITY,
            log_level: "debug".into(),
            debug: false,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show the stats window.  When off the session runs until Ctrl-C or
    /// until its inputs are exhausted.
    pub enabled: bool,
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
    /// Last saved window position `(x, y)` in screen pixels.  `None` lets
    /// the window manager decide.
    pub window_position: Option<(f32, f32)>,
    /// Ask before closing the window.
    pub confirm_close: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            always_on_top: false,
            window_position: None,
            confirm_close: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use treadmill_monitor::config::AppConfig;
///
/// // Returns Default when the file is missing.
/// let config = AppConfig::load().unwrap();
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub device: DeviceConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Closing the window throws away accumulated totals when the session
    /// is resumable, so the close dialog is forced on in that case.
    pub fn confirm_close(&self) -> bool {
        self.ui.confirm_close || self.session.resumable
    }

    /// Default filter for `env_logger`.
    pub fn log_filter(&self) -> &'static str {
        if self.session.debug {
            "debug"
        } else {
            "info"
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
