//! Persistent key/value storage for downloaded fonts and cached metadata.
//!
//! Keys are `:`-separated (`data:fonts:<file>`, `meta:fonts:<file>`). Raw entries hold bytes;
//! item entries hold JSON values, typically a [`CacheEnvelope`].

use crate::{Error, Result};
use chrono::{TimeDelta, Utc};
use futures::future::BoxFuture;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Written into every envelope; a mismatch invalidates the entry.
pub const CACHE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default lifetime of a cached entry (seven days).
pub fn default_ttl() -> TimeDelta {
    TimeDelta::days(7)
}

pub fn data_key(filename: &str) -> String {
    format!("data:fonts:{filename}")
}

pub fn meta_key(filename: &str) -> String {
    format!("meta:fonts:{filename}")
}

pub trait CacheStorage: Send + Sync {
    fn get_raw<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    fn set_raw<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    fn get_item<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<serde_json::Value>>> {
        Box::pin(async move {
            match self.get_raw(key).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        })
    }

    fn set_item<'a>(
        &'a self,
        key: &'a str,
        value: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let bytes = serde_json::to_vec(value)?;
            self.set_raw(key, bytes).await
        })
    }
}

/// `{ version, expires, data }` wrapper around a cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    /// Expiry as Unix epoch milliseconds.
    pub expires: i64,
    pub version: String,
    pub data: T,
}

impl<T> CacheEnvelope<T> {
    pub fn new(data: T, version: &str, ttl: TimeDelta) -> Self {
        Self {
            expires: (Utc::now() + ttl).timestamp_millis(),
            version: version.to_string(),
            data,
        }
    }

    pub fn is_valid(&self, version: &str) -> bool {
        self.version == version && self.expires >= Utc::now().timestamp_millis()
    }
}

/// Storage rooted at a directory; each `:` in a key becomes a path separator.
#[derive(Debug, Clone)]
pub struct FsStorage {
    base: PathBuf,
}

impl FsStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.base.clone();
        for segment in key.split(':').filter(|s| !s.is_empty()) {
            match segment {
                "." | ".." => path.push("_"),
                s => path.push(s.replace(['/', '\\'], "_")),
            }
        }
        path
    }
}

impl CacheStorage for FsStorage {
    fn get_raw<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        Box::pin(async move {
            let path = self.path_for(key);
            match std::fs::read(&path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(Error::cache_io(path, err)),
            }
        })
    }

    fn set_raw<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = self.path_for(key);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| Error::cache_io(parent, e))?;
            }
            std::fs::write(&path, value).map_err(|e| Error::cache_io(path, e))
        })
    }
}

/// Process-local storage, mostly for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<FxHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().remove(key)
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStorage for MemoryStorage {
    fn get_raw<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        let value = self.lock().get(key).cloned();
        Box::pin(futures::future::ready(Ok(value)))
    }

    fn set_raw<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        self.lock().insert(key.to_string(), value);
        Box::pin(futures::future::ready(Ok(())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedDataOptions {
    pub ttl: TimeDelta,
    pub version: String,
}

impl Default for CachedDataOptions {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            version: CACHE_VERSION.to_string(),
        }
    }
}

/// Returns the cached value under `key` when its envelope is current, otherwise runs `fetch`
/// and stores the result with a fresh expiry.
///
/// An unreadable or malformed entry counts as a miss.
pub async fn cached_data<T, F, Fut>(
    storage: &dyn CacheStorage,
    key: &str,
    fetch: F,
    options: &CachedDataOptions,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(data) = read_envelope(storage, key, &options.version).await {
        return Ok(data);
    }
    let data = fetch().await?;
    let envelope = CacheEnvelope::new(&data, &options.version, options.ttl);
    storage.set_item(key, &serde_json::to_value(&envelope)?).await?;
    Ok(data)
}

/// Like [`cached_data`], but a failure while fetching or storing is handed to `on_error`,
/// whose value is returned instead.
pub async fn cached_data_or_else<T, F, Fut, E, EFut>(
    storage: &dyn CacheStorage,
    key: &str,
    fetch: F,
    options: &CachedDataOptions,
    on_error: E,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    E: FnOnce(Error) -> EFut,
    EFut: Future<Output = Result<T>>,
{
    match cached_data(storage, key, fetch, options).await {
        Ok(data) => Ok(data),
        Err(err) => on_error(err).await,
    }
}

async fn read_envelope<T: DeserializeOwned>(
    storage: &dyn CacheStorage,
    key: &str,
    version: &str,
) -> Option<T> {
    let value = match storage.get_item(key).await {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(err) => {
            tracing::debug!(key, "ignoring unreadable cache entry: {err}");
            return None;
        }
    };
    let envelope: CacheEnvelope<T> = serde_json::from_value(value).ok()?;
    envelope.is_valid(version).then_some(envelope.data)
}
