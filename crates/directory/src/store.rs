//! Key-value store trait and implementations.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use keygate_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Trait for persistent key-value backends holding string documents.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the document under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditionally replace the document under `key`.
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Replace the document under `key` only if it still equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: String,
    ) -> Result<bool>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: String,
    ) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        entries.insert(key.to_string(), new);
        Ok(true)
    }
}

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never observes a half-written document. Compare-and-swap is
/// atomic among callers sharing this instance, whose writes are serialized
/// by a mutex. Two instances on the same directory, in one process or
/// several, do not coordinate and can lose updates.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Opened file store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !key.starts_with('.');
        if valid {
            Ok(self.root.join(format!("{key}.json")))
        } else {
            Err(Error::store_failed("resolve", format!("invalid key '{key}'")))
        }
    }

    async fn read_path(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::store_failed("read", format!("{}: {e}", path.display()))),
        }
    }

    async fn write_path(path: &Path, value: &str) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| Error::store_failed("write", format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| Error::store_failed("rename", format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Self::read_path(&self.path_for(key)?).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        Self::write_path(&path, &value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: String,
    ) -> Result<bool> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        let current = Self::read_path(&path).await?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        Self::write_path(&path, &new).await?;
        Ok(true)
    }
}

/// A wrapper that adds tracing to a store.
pub struct TracingStore<S: KeyValueStore> {
    inner: S,
}

impl<S: KeyValueStore> TracingStore<S> {
    /// Create a new tracing store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for TracingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        tracing::trace!(key, "Reading document");
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        tracing::debug!(key, bytes = value.len(), "Writing document");
        self.inner.put(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: String,
    ) -> Result<bool> {
        let swapped = self.inner.compare_and_swap(key, expected, new).await?;
        if swapped {
            tracing::debug!(key, "Document swapped");
        } else {
            tracing::debug!(key, "Document changed underneath, swap refused");
        }
        Ok(swapped)
    }
}

/// Outcome of a read-modify-write closure.
#[derive(Debug)]
pub enum Write<T> {
    /// The document was modified and must be committed.
    Commit(T),
    /// Nothing changed; skip the write.
    Unchanged(T),
}

/// Read-modify-write a JSON document under `key` with compare-and-swap.
///
/// `f` sees a freshly decoded document on every attempt (the default value
/// when absent) and may run more than once. An `Err` from `f` aborts
/// without writing.
///
/// # Errors
///
/// Returns the store's error, a serialization error for an undecodable
/// document, `f`'s own error, or `Conflict` after `max_attempts` lost races.
pub async fn update_document<D, R, F>(
    store: &dyn KeyValueStore,
    key: &str,
    max_attempts: u32,
    mut f: F,
) -> Result<R>
where
    D: Serialize + DeserializeOwned + Default + Send,
    R: Send,
    F: FnMut(&mut D) -> Result<Write<R>> + Send,
{
    for attempt in 1..=max_attempts {
        let raw = store.get(key).await?;
        let mut doc: D = decode(raw.as_deref())?;

        match f(&mut doc)? {
            Write::Unchanged(out) => return Ok(out),
            Write::Commit(out) => {
                let encoded = serde_json::to_string(&doc)
                    .map_err(|e| Error::serialization(e.to_string()))?;
                if store.compare_and_swap(key, raw.as_deref(), encoded).await? {
                    return Ok(out);
                }
                debug!(key, attempt, "Write conflicted, retrying");
            }
        }
    }

    Err(Error::conflict(key, max_attempts))
}

/// Decode a JSON document, treating absence as the default value.
///
/// # Errors
///
/// Returns a serialization error if the document is not valid JSON for `D`.
pub fn decode<D: DeserializeOwned + Default>(raw: Option<&str>) -> Result<D> {
    raw.map_or_else(
        || Ok(D::default()),
        |s| serde_json::from_str(s).map_err(|e| Error::serialization(e.to_string())),
    )
}
