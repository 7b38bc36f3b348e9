use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upload rejected with HTTP {status}")]
    Status { status: u16 },

    #[error("Upload endpoint '{0}' is not a valid URL")]
    InvalidEndpoint(String),

    #[error("Upload service returned no link")]
    EmptyResponse,

    #[error("Failed to serialize rules: {0}")]
    Serialize(String),
}

/// Sends a file somewhere and returns a shareable URL for it.
#[async_trait]
pub trait Uploader: Send + Sync + 'static {
    async fn upload(
        &self,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError>;
}

/// Uploader that POSTs the file body to an endpoint which answers with the
/// public URL as plain text.
pub struct HttpUploader {
    client: Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(
        &self,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, UploadError> {
        let bytes = content.len();
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|_| UploadError::InvalidEndpoint(self.endpoint.clone()))?;
        url.query_pairs_mut().append_pair("fileName", file_name);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
            });
        }

        let url = response.text().await?.trim().to_string();
        if url.is_empty() {
            return Err(UploadError::EmptyResponse);
        }
        tracing::info!(file_name, bytes, url = %url, "Uploaded rules");
        Ok(url)
    }
}
