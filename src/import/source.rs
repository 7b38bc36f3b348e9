//! Resolution of import text into rule JSON.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::config::ImportConfig;

use super::error::ImportError;

/// URL suffix that suppresses the default `User-Agent` header.
pub const NO_USER_AGENT_SUFFIX: &str = "#requestWithoutUA";

/// Turns what the user pasted into rule text.
///
/// - `http(s)` URLs are downloaded
/// - `file://` references are read from disk
/// - anything else is taken literally
pub struct SourceResolver {
    client: Client,
    bare_client: Client,
}

impl SourceResolver {
    pub fn new(config: &ImportConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()?;
        let bare_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            bare_client,
        })
    }

    pub async fn resolve(&self, text: &str) -> Result<String, ImportError> {
        let text = text.trim();
        match Url::parse(text) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.fetch(text).await,
            Ok(url) if url.scheme() == "file" => read_local(&url).await,
            _ => Ok(text.to_string()),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, ImportError> {
        let (url, client) = match url.strip_suffix(NO_USER_AGENT_SUFFIX) {
            Some(stripped) => (stripped, &self.bare_client),
            None => (url, &self.client),
        };
        tracing::debug!(url = %url, "Fetching import source");

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|source| ImportError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ImportError::Fetch {
            url: url.to_string(),
            source,
        })
    }
}

async fn read_local(url: &Url) -> Result<String, ImportError> {
    let path = url.to_file_path().map_err(|_| ImportError::Io {
        path: url.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a local file path"),
    })?;
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ImportError::Io {
            path: path.display().to_string(),
            source,
        })
}
