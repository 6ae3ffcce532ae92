//! Two-tier font byte cache: per-build memory plus a persistent [`CacheStorage`], with at most one
//! in-flight download per cache filename.

use crate::storage::{CacheEnvelope, CacheStorage, CachedDataOptions, data_key, meta_key};
use crate::{Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fetches remote font bytes. Hosts plug in their HTTP client here.
pub trait FontFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// A fetcher for environments without network access; every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl FontFetcher for OfflineFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(futures::future::ready(Err(Error::Fetch {
            url: url.to_string(),
            message: "no font fetcher configured".to_string(),
        })))
    }
}

type SharedDownload = Shared<BoxFuture<'static, std::result::Result<Arc<[u8]>, Arc<Error>>>>;

pub struct FontAssetCache {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn FontFetcher>,
    options: CachedDataOptions,
    memory: Mutex<FxHashMap<String, Arc<[u8]>>>,
    in_flight: Mutex<FxHashMap<String, SharedDownload>>,
}

impl fmt::Debug for FontAssetCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontAssetCache")
            .field("options", &self.options)
            .field("memory_entries", &lock(&self.memory).len())
            .field("in_flight", &lock(&self.in_flight).len())
            .finish_non_exhaustive()
    }
}

impl FontAssetCache {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn FontFetcher>) -> Self {
        Self::with_options(storage, fetcher, CachedDataOptions::default())
    }

    pub fn with_options(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn FontFetcher>,
        options: CachedDataOptions,
    ) -> Self {
        Self {
            storage,
            fetcher,
            options,
            memory: Mutex::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Bytes for `filename`, downloading `url` only when neither tier has a valid entry.
    ///
    /// Concurrent callers for the same filename share one download.
    pub async fn get(&self, filename: &str, url: &str) -> Result<Arc<[u8]>> {
        let download = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(bytes) = lock(&self.memory).get(filename) {
                return Ok(Arc::clone(bytes));
            }
            in_flight
                .entry(filename.to_string())
                .or_insert_with(|| self.start(filename, url))
                .clone()
        };

        let result = download.clone().await;
        if let Ok(bytes) = &result {
            lock(&self.memory).insert(filename.to_string(), Arc::clone(bytes));
        }
        {
            let mut in_flight = lock(&self.in_flight);
            // A retry may already have replaced a failed download.
            if in_flight
                .get(filename)
                .is_some_and(|current| current.ptr_eq(&download))
            {
                in_flight.remove(filename);
            }
        }
        result.map_err(Error::Shared)
    }

    /// Drops the per-build memory tier; the persistent tier is untouched.
    pub fn clear_memory(&self) {
        lock(&self.memory).clear();
    }

    fn start(&self, filename: &str, url: &str) -> SharedDownload {
        let storage = Arc::clone(&self.storage);
        let fetcher = Arc::clone(&self.fetcher);
        let options = self.options.clone();
        let filename = filename.to_string();
        let url = url.to_string();
        async move {
            load(storage.as_ref(), fetcher.as_ref(), &options, &filename, &url)
                .await
                .map_err(Arc::new)
        }
        .boxed()
        .shared()
    }
}

async fn load(
    storage: &dyn CacheStorage,
    fetcher: &dyn FontFetcher,
    options: &CachedDataOptions,
    filename: &str,
    url: &str,
) -> Result<Arc<[u8]>> {
    if let Some(bytes) = read_persisted(storage, options, filename).await {
        tracing::debug!(filename, "font served from persistent cache");
        return Ok(bytes.into());
    }

    tracing::info!("Downloading font `{url}`");
    let bytes = fetcher.fetch(url).await?;
    if let Err(err) = persist(storage, options, filename, url, &bytes).await {
        tracing::warn!("Could not cache font `{filename}`: {err}");
    }
    Ok(bytes.into())
}

async fn read_persisted(
    storage: &dyn CacheStorage,
    options: &CachedDataOptions,
    filename: &str,
) -> Option<Vec<u8>> {
    let meta = storage.get_item(&meta_key(filename)).await.ok().flatten()?;
    let envelope: CacheEnvelope<String> = serde_json::from_value(meta).ok()?;
    if !envelope.is_valid(&options.version) {
        return None;
    }
    storage.get_raw(&data_key(filename)).await.ok().flatten()
}

async fn persist(
    storage: &dyn CacheStorage,
    options: &CachedDataOptions,
    filename: &str,
    url: &str,
    bytes: &[u8],
) -> Result<()> {
    storage.set_raw(&data_key(filename), bytes.to_vec()).await?;
    let envelope = CacheEnvelope::new(url, &options.version, options.ttl);
    storage
        .set_item(&meta_key(filename), &serde_json::to_value(&envelope)?)
        .await
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
