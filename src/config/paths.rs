//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir:
//!   Windows: %APPDATA%\treadmill-monitor\
//!   macOS:   ~/Library/Application Support/treadmill-monitor/
//!   Linux:   ~/.config/treadmill-monitor/
//!
//! `TREADMILL_MONITOR_CONFIG` replaces the settings file path outright.

use std::path::PathBuf;

/// Environment variable naming an explicit `settings.toml`.
pub const CONFIG_ENV: &str = "TREADMILL_MONITOR_CONFIG";

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "treadmill-monitor";

    /// Resolves paths using the `dirs` crate, honouring [`CONFIG_ENV`].
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        Self::resolve(std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    fn resolve(override_file: Option<PathBuf>) -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        match override_file {
            Some(settings_file) => {
                let config_dir = settings_file
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or(config_dir);
                Self {
                    config_dir,
                    settings_file,
                }
            }
            None => Self {
                settings_file: config_dir.join("settings.toml"),
                config_dir,
            },
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_end_in_app_dir() {
        let paths = AppPaths::resolve(None);
        assert!(paths.config_dir.ends_with("treadmill-monitor"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
    }

    #[test]
    fn override_replaces_settings_file() {
        let paths = AppPaths::resolve(Some(PathBuf::from("/tmp/tm/custom.toml")));
        assert_eq!(paths.settings_file, PathBuf::from("/tmp/tm/custom.toml"));
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/tm"));
    }
}
