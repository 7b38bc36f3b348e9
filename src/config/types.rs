use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Timing of the rule engine's reactive pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period before a search key change re-filters (default: 300).
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    /// How long the composed state keeps updating after the last
    /// subscriber detaches (default: 5000).
    #[serde(default = "default_share_stop_timeout_ms")]
    pub share_stop_timeout_ms: u64,
}

/// Remote import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// User-Agent sent when fetching import URLs.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Upload collaborator settings. An empty endpoint disables uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub endpoint: String,
    /// File name reported to the upload service.
    #[serde(default = "default_upload_file_name")]
    pub file_name: String,
}

/// Location of the JSON rule files used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_share_stop_timeout_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    format!("rulesync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_upload_file_name() -> String {
    "rules.json".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rulesync")
}

impl EngineConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn share_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.share_stop_timeout_ms)
    }
}

impl UploadConfig {
    pub fn is_enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            share_stop_timeout_ms: default_share_stop_timeout_ms(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            file_name: default_upload_file_name(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
