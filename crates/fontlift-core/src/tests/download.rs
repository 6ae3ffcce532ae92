use super::support::CountingFetcher;
use crate::Error;
use crate::download::*;
use crate::storage::{CacheStorage, CachedDataOptions, MemoryStorage, data_key, meta_key};
use chrono::TimeDelta;
use futures::executor::block_on;
use futures::FutureExt;
use futures::future::{join, join_all};
use futures::task::noop_waker_ref;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::task::{Context, Poll};

const URL: &str = "https://fonts.example/a.woff2";

#[test]
fn concurrent_requests_share_one_download() {
    let fetcher = Arc::new(CountingFetcher::default());
    let cache = FontAssetCache::new(Arc::new(MemoryStorage::new()), fetcher.clone());

    let results = block_on(join_all((0..3).map(|_| cache.get("a.woff2", URL))));
    for result in results {
        assert_eq!(&*result.unwrap(), format!("bytes:{URL}").as_bytes());
    }
    block_on(cache.get("a.woff2", URL)).unwrap();
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn persistent_tier_survives_builds() {
    let storage = Arc::new(MemoryStorage::new());
    let first = Arc::new(CountingFetcher::default());
    block_on(FontAssetCache::new(storage.clone(), first.clone()).get("a.woff2", URL)).unwrap();
    assert_eq!(first.calls(), 1);
    assert!(storage.contains_key(&data_key("a.woff2")));
    assert!(storage.contains_key(&meta_key("a.woff2")));

    let second = Arc::new(CountingFetcher::default());
    let bytes =
        block_on(FontAssetCache::new(storage.clone(), second.clone()).get("a.woff2", URL)).unwrap();
    assert_eq!(&*bytes, format!("bytes:{URL}").as_bytes());
    assert_eq!(second.calls(), 0);
}

#[test]
fn stale_entries_are_downloaded_again() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(CountingFetcher::default());
    let old = CachedDataOptions {
        version: "0.0.1".to_string(),
        ..CachedDataOptions::default()
    };
    block_on(FontAssetCache::with_options(storage.clone(), fetcher.clone(), old).get("a.woff2", URL))
        .unwrap();

    block_on(FontAssetCache::new(storage.clone(), fetcher.clone()).get("a.woff2", URL)).unwrap();
    assert_eq!(fetcher.calls(), 2);

    let expired = CachedDataOptions {
        ttl: TimeDelta::seconds(-1),
        ..CachedDataOptions::default()
    };
    let cache = FontAssetCache::with_options(storage.clone(), fetcher.clone(), expired);
    block_on(cache.get("a.woff2", URL)).unwrap();
    assert_eq!(fetcher.calls(), 3);
}

#[test]
fn missing_bytes_invalidate_metadata() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(CountingFetcher::default());
    block_on(FontAssetCache::new(storage.clone(), fetcher.clone()).get("a.woff2", URL)).unwrap();
    storage.remove(&data_key("a.woff2"));
    block_on(FontAssetCache::new(storage.clone(), fetcher.clone()).get("a.woff2", URL)).unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn fetch_failures_propagate_and_are_retried() {
    let fetcher = Arc::new(CountingFetcher {
        failing: vec![URL.to_string()],
        ..CountingFetcher::default()
    });
    let storage = Arc::new(MemoryStorage::new());
    let cache = FontAssetCache::new(storage.clone(), fetcher.clone());

    let results = block_on(join_all((0..2).map(|_| cache.get("a.woff2", URL))));
    for result in results {
        let err = result.unwrap_err();
        assert!(matches!(&err, Error::Shared(inner) if matches!(**inner, Error::Fetch { .. })));
        assert!(err.to_string().contains("connection refused"));
    }
    assert_eq!(fetcher.calls(), 1);
    assert!(storage.is_empty());

    assert!(block_on(cache.get("a.woff2", URL)).is_err());
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn late_waiters_keep_a_retried_download() {
    let fetcher = Arc::new(CountingFetcher {
        fail_first: AtomicUsize::new(1),
        ..CountingFetcher::default()
    });
    let cache = FontAssetCache::new(Arc::new(MemoryStorage::new()), fetcher.clone());
    let mut cx = Context::from_waker(noop_waker_ref());

    let mut first = Box::pin(cache.get("a.woff2", URL));
    let mut second = Box::pin(cache.get("a.woff2", URL));
    assert!(first.poll_unpin(&mut cx).is_pending());
    // The second waiter drives the shared download to its failure.
    assert!(matches!(second.poll_unpin(&mut cx), Poll::Ready(Err(_))));

    let mut retry = Box::pin(cache.get("a.woff2", URL));
    assert!(retry.poll_unpin(&mut cx).is_pending());
    // The first waiter only now observes the failure.
    assert!(matches!(first.poll_unpin(&mut cx), Poll::Ready(Err(_))));

    let joined = cache.get("a.woff2", URL);
    let (retried, joined) = block_on(join(retry, joined));
    assert_eq!(&*retried.unwrap(), format!("bytes:{URL}").as_bytes());
    assert_eq!(&*joined.unwrap(), format!("bytes:{URL}").as_bytes());
    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn offline_fetcher_always_fails() {
    let err = block_on(OfflineFetcher.fetch(URL)).unwrap_err();
    assert!(matches!(err, Error::Fetch { url, .. } if url == URL));
}

#[test]
fn clearing_memory_falls_back_to_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(CountingFetcher::default());
    let cache = FontAssetCache::new(storage.clone(), fetcher.clone());
    block_on(cache.get("a.woff2", URL)).unwrap();
    cache.clear_memory();
    block_on(cache.get("a.woff2", URL)).unwrap();
    assert_eq!(fetcher.calls(), 1);
    assert!(block_on(storage.get_raw(&data_key("a.woff2"))).unwrap().is_some());
}
