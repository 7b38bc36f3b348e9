use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::{watch, Mutex};

use crate::model::RuleEntity;

use super::memory::{remove_keys, upsert_into, MemoryStore};
use super::{RuleStore, StoreError};

/// Store persisted as a pretty-printed JSON array, the same shape as an
/// export. Writes go to a temp file that is renamed over the original, and
/// a sibling `.lock` file keeps a second process from opening the store.
/// Disk writes run on the blocking pool, one at a time.
pub struct JsonFileStore<E: RuleEntity> {
    path: PathBuf,
    inner: MemoryStore<E>,
    writer: Mutex<()>,
    // Held for the lifetime of the store; dropping it releases the lock.
    _lock: File,
}

impl<E: RuleEntity> JsonFileStore<E> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| io_error(&lock_path, source))?;
        lock.try_lock_exclusive().map_err(|_| StoreError::Locked {
            path: path.display().to_string(),
        })?;

        let rules = read_rules(&path)?;
        tracing::debug!(path = %path.display(), count = rules.len(), "Opened rule file");

        Ok(Self {
            path,
            inner: MemoryStore::with_rules(rules),
            writer: Mutex::new(()),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.inner.snapshot()
    }

    /// Stage `mutate`, write the result to disk and only then publish it.
    /// A failed write leaves the store untouched.
    async fn write<M>(&self, mutate: M) -> Result<(), StoreError>
    where
        M: FnOnce(&mut Vec<E>) + Send,
    {
        let _writer = self.writer.lock().await;
        let next = self.inner.staged(mutate);
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || write_rules(&path, &next).map(|()| next))
            .await
            .map_err(|e| io_error(&self.path, std::io::Error::other(e)))??;
        self.inner.publish(next);
        Ok(())
    }
}

#[async_trait]
impl<E: RuleEntity> RuleStore<E> for JsonFileStore<E> {
    fn observe(&self) -> watch::Receiver<Vec<E>> {
        self.inner.observe()
    }

    async fn find(&self, key: &E::Key) -> Result<Option<E>, StoreError> {
        Ok(self.inner.find_sync(key))
    }

    async fn upsert_all(&self, rules: Vec<E>) -> Result<(), StoreError> {
        self.write(|current| upsert_into(current, rules)).await
    }

    async fn delete(&self, keys: &[E::Key]) -> Result<(), StoreError> {
        self.write(|current| remove_keys(current, keys)).await
    }
}

fn read_rules<E: RuleEntity>(path: &Path) -> Result<Vec<E>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })
}

fn write_rules<E: RuleEntity>(path: &Path, rules: &[E]) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(rules).map_err(|source| StoreError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    fs::write(&temp, bytes).map_err(|source| io_error(&temp, source))?;
    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        io_error(path, source)
    })
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
