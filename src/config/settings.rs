//! Runtime settings for the command line tool
//!
//! Settings are read from `settings.toml` in the platform config directory:
//! - **Linux**: `~/.config/camgraph/`
//! - **macOS**: `~/Library/Application Support/camgraph/`
//! - **Windows**: `%APPDATA%\camgraph\`
//!
//! Command line flags override whatever is loaded here.

use crate::config::APP_ID;
use crate::error::{CamGraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,camgraph=debug";

/// How pipeline snapshots are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,

    /// Snapshot output format
    pub output: OutputFormat,

    /// Also write logs to this file
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            output: OutputFormat::Text,
            log_file: None,
        }
    }
}

/// Path of the settings file in the platform config directory
pub fn settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(SETTINGS_FILE))
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CamGraphError::Config(format!("Failed to read settings: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| CamGraphError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Load settings from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CamGraphError::Config(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| CamGraphError::Config(format!("Failed to write settings: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(settings.output, OutputFormat::Text);
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = toml::from_str("output = \"json\"").unwrap();
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_missing_file_is_default() {
        let settings = Settings::load("/nonexistent/camgraph/settings.toml").unwrap();
        assert_eq!(settings, Settings::default());
    }
}
