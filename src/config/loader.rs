use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Longest accepted search debounce.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/rulesync/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("rulesync").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The search debounce is at most 10 seconds
    /// - The import timeout is non-zero
    /// - A configured upload endpoint is an absolute http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.search_debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "search_debounce_ms must be at most {} (got {})",
                    MAX_DEBOUNCE_MS, self.engine.search_debounce_ms
                ),
            });
        }

        if self.import.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "import timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.upload.is_enabled() {
            let endpoint = self.upload.endpoint.trim();
            let valid = reqwest::Url::parse(endpoint)
                .map(|url| matches!(url.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::ValidationError {
                    message: format!("Upload endpoint '{}' is not an http(s) URL", endpoint),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.engine.search_debounce_ms, 300);
        assert_eq!(config.engine.share_stop_timeout_ms, 5000);
        assert!(!config.upload.is_enabled());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[engine]
search_debounce_ms = 150

[upload]
endpoint = "https://paste.example.com/api"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine.search_debounce_ms, 150);
        assert_eq!(config.engine.share_stop_timeout_ms, 5000);
        assert_eq!(config.upload.file_name, "rules.json");
        assert!(config.upload.is_enabled());
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "invalid { toml }").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.engine.search_debounce_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.import.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload.endpoint = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_path_ends_with_expected() {
        assert!(Config::config_path().ends_with("rulesync/config.toml"));
    }
}
