use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::controller::ControllerSettings;
use crate::core::clock::DEFAULT_TIMEZONE;

/// Overrides `api_base_url` when set.
pub const API_URL_ENV: &str = "CALLME_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("callme")
        .join("config.json")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Used for new reminders when none is given.
    pub default_timezone: String,
    pub settle_delay_ms: u64,
    pub undo_window_secs: u64,
    pub tick_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub debug_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            default_timezone: DEFAULT_TIMEZONE.into(),
            settle_delay_ms: 300,
            undo_window_secs: 5,
            tick_interval_secs: 60,
            request_timeout_secs: 15,
            debug_logging: false,
        }
    }
}

impl ClientConfig {
    pub fn config_path() -> PathBuf {
        default_config_path()
    }

    /// Load from the default path. A missing file gives the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            log::debug!("Using API URL from {}", API_URL_ENV);
            self.api_base_url = url.trim().to_string();
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            undo_window: Duration::from_secs(self.undo_window_secs),
            // A zero period would panic in tokio's interval.
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("callme-config-{}-{}", std::process::id(), name))
            .join("config.json")
    }

    #[test]
    fn defaults_match_controller_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.controller_settings(), ControllerSettings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_base_url": "https://calls.example.com", "undo_window_secs": 8}"#)
                .unwrap();
        assert_eq!(config.api_base_url, "https://calls.example.com");
        assert_eq!(config.undo_window_secs, 8);
        assert_eq!(config.default_timezone, "America/New_York");
        assert_eq!(config.tick_interval_secs, 60);
    }

    #[test]
    fn missing_file_is_default() {
        let config = ClientConfig::load_from(&scratch("missing")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn save_then_load() {
        let path = scratch("save");
        let config = ClientConfig {
            debug_logging: true,
            ..ClientConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ClientConfig::load_from(&path).unwrap(), config);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn env_override() {
        let mut config = ClientConfig::default();
        config.apply_env(Some("  ".to_string()));
        assert_eq!(config.api_base_url, "http://localhost:8000");
        config.apply_env(Some("http://10.0.0.2:9000".to_string()));
        assert_eq!(config.api_base_url, "http://10.0.0.2:9000");
    }
}
