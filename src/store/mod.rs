//! Rule store interface and the bundled adapters.
//!
//! The store is the system of record. The engine only observes its
//! snapshot stream and writes through `upsert_all` / `delete`.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::model::RuleEntity;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Rule file I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Rule file '{path}' is not a JSON rule array: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Rule file '{path}' is locked by another process")]
    Locked { path: String },
}

#[async_trait]
pub trait RuleStore<E: RuleEntity>: Send + Sync + 'static {
    /// Full collection in display order. Re-emits after every mutation.
    fn observe(&self) -> watch::Receiver<Vec<E>>;

    async fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError>;

    /// Insert or replace by key. Either every rule is written or none is.
    async fn upsert_all(&self, rules: Vec<E>) -> Result<(), StoreError>;

    async fn delete(&self, keys: &[E::Key]) -> Result<(), StoreError>;
}
