use crate::cache::CacheEntry;
use crate::error::{Error, Result};
use crate::store::Backend;
use crate::utils::FileKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

pub type SharedEntry = Arc<Mutex<CacheEntry>>;

/// process scoped map from file identity to its cache entry
///
/// The map only guards insert/lookup, file content is guarded by the mutex of
/// each entry. Map references are never held while an entry is locked.
#[derive(Default)]
pub struct CacheDirectory {
    entries: DashMap<FileKey, SharedEntry>,
}

impl CacheDirectory {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &FileKey) -> Option<SharedEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// install `entry` for `key`, returning the entry it displaced
    pub fn replace(&self, key: FileKey, entry: CacheEntry) -> Option<SharedEntry> {
        self.entries.insert(key, Arc::new(Mutex::new(entry)))
    }

    /// cached entry, or one loaded from `backend` on first touch
    ///
    /// The load runs under the shard lock of `key`, so a row read here can't
    /// be overtaken by a flush of a concurrently loaded entry.
    pub fn resolve(&self, key: &FileKey, backend: &dyn Backend) -> Result<SharedEntry> {
        if let Some(e) = self.get(key) {
            return Ok(e);
        }
        match self.entries.entry(key.clone()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(v) => {
                let info = backend
                    .get_file(&key.container, &key.name)?
                    .ok_or_else(|| Error::not_found(&key.container, &key.name))?;
                Ok(v.insert(Arc::new(Mutex::new(CacheEntry::new(info)))).value().clone())
            }
        }
    }

    /// drop `key` only if it still maps to `entry`
    pub fn remove_if_same(&self, key: &FileKey, entry: &SharedEntry) -> bool {
        self.entries.remove_if(key, |_, v| Arc::ptr_eq(v, entry)).is_some()
    }

    pub fn keys(&self) -> Vec<FileKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn keys_in(&self, container: &str) -> Vec<FileKey> {
        self.entries
            .iter()
            .filter(|e| e.key().container == container)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
