use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::source::DEFAULT_BASE_URL;

/// Application configuration loaded from TOML config file.
/// All fields have defaults; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the remote data tables.
    pub data_url: String,
    /// Read datasets from this directory instead of the network.
    pub data_dir: Option<PathBuf>,
    /// Custom preferences database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Global HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Quiet period before search text is applied, in milliseconds.
    pub debounce_ms: u64,
    /// Rows rendered beyond each edge of the viewport.
    pub overscan: usize,
    /// Start with the compact column set when no preference is stored.
    pub compact_columns: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_BASE_URL.to_string(),
            data_dir: None,
            db_path: None,
            timeout_secs: 30,
            debounce_ms: 300,
            overscan: 10,
            compact_columns: false,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/radarview/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default preferences database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("prefs.db")
    } else {
        PathBuf::from("radarview-prefs.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let c = AppConfig::parse("").unwrap();
        assert_eq!(c.data_url, DEFAULT_BASE_URL);
        assert_eq!(c.timeout_secs, 30);
        assert_eq!(c.debounce(), Duration::from_millis(300));
        assert_eq!(c.overscan, 10);
        assert!(c.data_dir.is_none());
    }

    #[test]
    fn test_partial_config() {
        let c = AppConfig::parse(
            r#"
            data_dir = "/srv/iidx"
            debounce_ms = 150
            compact_columns = true
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, Some(PathBuf::from("/srv/iidx")));
        assert_eq!(c.debounce_ms, 150);
        assert!(c.compact_columns);
        assert_eq!(c.timeout_secs, 30);
    }

    #[test]
    fn test_bad_config_is_an_error() {
        assert!(AppConfig::parse("timeout_secs = \"soon\"").is_err());
    }
}
