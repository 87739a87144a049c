//! Configuration file support for hivemux.
//!
//! Configuration is loaded from `~/.config/hivemux/config.toml` with the
//! following precedence:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.config/hivemux/config.toml
//! status_dir = "~/.hivemux/status"
//! default_tool = "claude"
//! theme = "dark"
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::store::Tool;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Directory the agent hook scripts write status files into
    pub status_dir: Option<PathBuf>,

    /// Tool preselected for new sessions
    pub default_tool: Option<Tool>,

    /// Theme name to use
    pub theme: Option<String>,
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default configuration if file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hivemux")
            .join("config.toml")
    }

    /// Merge with CLI overrides.
    ///
    /// CLI arguments take precedence over config file values.
    pub fn with_overrides(mut self, status_dir: Option<PathBuf>) -> Self {
        if status_dir.is_some() {
            self.status_dir = status_dir;
        }
        self
    }

    /// Get the status directory, falling back to environment variable or default.
    pub fn status_dir(&self) -> PathBuf {
        self.status_dir
            .clone()
            .or_else(|| std::env::var("HIVEMUX_STATUS_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".hivemux/status")
            })
    }

    /// Get the default tool for new sessions.
    pub fn default_tool(&self) -> Tool {
        self.default_tool.clone().unwrap_or(Tool::Claude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.status_dir.is_none());
        assert!(config.default_tool.is_none());
        assert!(config.theme.is_none());
        assert_eq!(config.default_tool(), Tool::Claude);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            status_dir = "/tmp/status"
            default_tool = "codex"
            theme = "dark"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.status_dir, Some(PathBuf::from("/tmp/status")));
        assert_eq!(config.default_tool, Some(Tool::Codex));
        assert_eq!(config.theme, Some("dark".to_string()));
    }

    #[test]
    fn test_cli_override_wins() {
        let config = Config {
            status_dir: Some(PathBuf::from("/from/file")),
            ..Config::default()
        };
        let merged = config.with_overrides(Some(PathBuf::from("/from/cli")));
        assert_eq!(merged.status_dir, Some(PathBuf::from("/from/cli")));
    }
}
