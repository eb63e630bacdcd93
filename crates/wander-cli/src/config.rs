//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wander_agent::ControllerConfig;

/// Default base URL of the planner API
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/api";

/// Configuration for wander
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the planner API
    pub server_url: Option<String>,
    /// Hide transient "Starting..." / "Processing..." narration
    pub suppress_bootstrap: Option<bool>,
    /// Print the structured data attached to progress steps and results
    pub show_data: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wander")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("WANDER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults with a warning
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
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

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            suppress_bootstrap: Some(true),
            show_data: Some(false),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Server URL, with `--server` taking precedence
    pub fn server_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn show_data(&self, cli: bool) -> bool {
        cli || self.show_data.unwrap_or(false)
    }

    /// Controller settings derived from this config
    pub fn controller_config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::default();
        if let Some(suppress) = self.suppress_bootstrap {
            config.suppress_bootstrap = suppress;
        }
        config
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# wander configuration file
# Place at ~/.config/wander/config.toml (Linux) or set WANDER_CONFIG_PATH

# Base URL of the planner API
server_url = "http://localhost:8000/api"

# Hide transient "Starting..." and "Processing..." messages
suppress_bootstrap = true

# Print structured data attached to progress steps and itineraries
show_data = false
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.server_url.as_deref(), Some(DEFAULT_SERVER_URL));
        assert_eq!(config.suppress_bootstrap, Some(true));
        assert_eq!(config.show_data, Some(false));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("show_data = true\n").unwrap();
        assert_eq!(config.server_url(None), DEFAULT_SERVER_URL);
        assert!(config.show_data(false));
        assert!(config.controller_config().suppress_bootstrap);
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            server_url: Some("http://planner.local/api".to_string()),
            suppress_bootstrap: Some(false),
            show_data: None,
        };
        assert_eq!(config.server_url(None), "http://planner.local/api");
        assert_eq!(
            config.server_url(Some("http://other:9000/api")),
            "http://other:9000/api"
        );
        assert!(config.show_data(true));
        assert!(!config.controller_config().suppress_bootstrap);
    }

    #[test]
    fn test_load_missing_or_invalid_file() {
        let dir = std::env::temp_dir().join(format!("wander-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        assert_eq!(Config::load_from(&path), Config::default());

        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, "server_url = [").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        let saved = Config {
            server_url: Some("https://example.com/api".to_string()),
            ..Default::default()
        };
        saved.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), saved);

        fs::remove_dir_all(&dir).ok();
    }
}
