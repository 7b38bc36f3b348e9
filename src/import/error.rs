use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while resolving, parsing or classifying an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Text is neither a JSON object nor an array of objects.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid rule JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to fetch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch '{url}': HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule store error: {0}")]
    Store(#[from] StoreError),
}
