use crate::Error;
use crate::storage::*;
use chrono::TimeDelta;
use futures::executor::block_on;
use serde_json::json;
use std::cell::Cell;

fn options(version: &str, ttl: TimeDelta) -> CachedDataOptions {
    CachedDataOptions {
        ttl,
        version: version.to_string(),
    }
}

#[test]
fn cached_data_reuses_valid_envelopes() {
    let storage = MemoryStorage::new();
    let calls = Cell::new(0);
    let fetch = || {
        calls.set(calls.get() + 1);
        async { Ok(vec!["Inter".to_string()]) }
    };
    let opts = CachedDataOptions::default();

    let first: Vec<String> = block_on(cached_data(&storage, "meta:families", fetch, &opts)).unwrap();
    let second: Vec<String> =
        block_on(cached_data(&storage, "meta:families", fetch, &opts)).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);

    let stored = block_on(storage.get_item("meta:families")).unwrap().unwrap();
    assert_eq!(stored["version"], json!(CACHE_VERSION));
    assert_eq!(stored["data"], json!(["Inter"]));
}

#[test]
fn version_mismatch_and_expiry_refetch() {
    let storage = MemoryStorage::new();
    let calls = Cell::new(0);
    let fetch = || {
        calls.set(calls.get() + 1);
        let n = calls.get();
        async move { Ok(n) }
    };

    let v1 = options("1", default_ttl());
    assert_eq!(block_on(cached_data(&storage, "k", fetch, &v1)).unwrap(), 1);
    assert_eq!(block_on(cached_data(&storage, "k", fetch, &v1)).unwrap(), 1);

    let v2 = options("2", default_ttl());
    assert_eq!(block_on(cached_data(&storage, "k", fetch, &v2)).unwrap(), 2);

    let expired = options("2", TimeDelta::milliseconds(-1));
    assert_eq!(block_on(cached_data(&storage, "k", fetch, &expired)).unwrap(), 3);
    assert_eq!(block_on(cached_data(&storage, "k", fetch, &expired)).unwrap(), 4);
}

#[test]
fn malformed_entries_count_as_misses() {
    let storage = MemoryStorage::new();
    block_on(storage.set_raw("k", b"not json".to_vec())).unwrap();
    let value: u32 = block_on(cached_data(
        &storage,
        "k",
        || async { Ok(7) },
        &CachedDataOptions::default(),
    ))
    .unwrap();
    assert_eq!(value, 7);
}

#[test]
fn on_error_replaces_failed_fetches() {
    let storage = MemoryStorage::new();
    let opts = CachedDataOptions::default();
    let fetch = || async {
        Err::<Vec<String>, _>(Error::Fetch {
            url: "https://catalog".to_string(),
            message: "offline".to_string(),
        })
    };

    let err = block_on(cached_data(&storage, "catalog", fetch, &opts)).unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));

    let value = block_on(cached_data_or_else(
        &storage,
        "catalog",
        fetch,
        &opts,
        |_| async { Ok(Vec::new()) },
    ))
    .unwrap();
    assert!(value.is_empty());
    assert!(storage.is_empty());
}

#[test]
fn fs_storage_maps_keys_to_nested_paths() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    assert_eq!(
        storage.path_for("data:fonts:a.woff2"),
        dir.path().join("data").join("fonts").join("a.woff2")
    );
    assert_eq!(
        storage.path_for("data:..:x/y"),
        dir.path().join("data").join("_").join("x_y")
    );

    assert_eq!(block_on(storage.get_raw("data:fonts:a.woff2")).unwrap(), None);
    block_on(storage.set_raw("data:fonts:a.woff2", vec![1, 2, 3])).unwrap();
    assert_eq!(
        block_on(storage.get_raw("data:fonts:a.woff2")).unwrap(),
        Some(vec![1, 2, 3])
    );

    block_on(storage.set_item("meta:fonts:a.woff2", &json!({ "ok": true }))).unwrap();
    assert_eq!(
        block_on(storage.get_item("meta:fonts:a.woff2")).unwrap(),
        Some(json!({ "ok": true }))
    );
}

#[test]
fn envelope_validity_checks_version_and_expiry() {
    let fresh = CacheEnvelope::new((), "1.0.0", default_ttl());
    assert!(fresh.is_valid("1.0.0"));
    assert!(!fresh.is_valid("2.0.0"));
    let stale = CacheEnvelope::new((), "1.0.0", TimeDelta::seconds(-5));
    assert!(!stale.is_valid("1.0.0"));
}
