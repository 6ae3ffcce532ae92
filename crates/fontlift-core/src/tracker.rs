//! Module/chunk → remote font URL bookkeeping across the bundler's phases.

use indexmap::{IndexMap, IndexSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Strips a `?query` suffix from a module id (`style.css?inline` → `style.css`).
pub fn module_id_without_query(id: &str) -> &str {
    id.split_once('?').map_or(id, |(path, _)| path)
}

#[derive(Debug, Default)]
pub struct ChunkTracker {
    map: Mutex<IndexMap<String, IndexSet<String>>>,
}

impl ChunkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, module_id: &str, url: &str) {
        self.lock()
            .entry(module_id_without_query(module_id).to_string())
            .or_default()
            .insert(url.to_string());
    }

    /// Unions every source module's URLs into `dest` (a chunk's facade module id).
    pub fn merge<'a>(&self, module_ids: impl IntoIterator<Item = &'a str>, dest: &str) {
        let mut map = self.lock();
        let mut merged: IndexSet<String> = map.get(dest).cloned().unwrap_or_default();
        let mut found = false;
        for id in module_ids {
            if let Some(urls) = map.get(id) {
                merged.extend(urls.iter().cloned());
                found = true;
            }
        }
        if found {
            map.insert(dest.to_string(), merged);
        }
    }

    pub fn urls_for_chunk(&self, id: &str) -> IndexSet<String> {
        self.lock().get(id).cloned().unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn snapshot(&self) -> IndexMap<String, IndexSet<String>> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, IndexSet<String>>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
