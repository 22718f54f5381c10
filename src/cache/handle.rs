//! Cache Handle Module
//!
//! Public facade over a shared store: simple get/set/delete, batch forms,
//! deferred writes and the item-pool surface.
//!
//! Handles are cheap clones of one shared state. There is no cross-process
//! locking: two processes writing the same file race on the whole-file
//! rewrite and the last writer wins silently.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{validate_key, CacheItem, CacheStats, CacheStore, Item};
use crate::error::{CacheError, Result};

// == Shared State ==
#[derive(Debug)]
struct CacheState {
    path: PathBuf,
    store: CacheStore,
    deferred: VecDeque<(String, Value)>,
    stats: CacheStats,
}

impl CacheState {
    fn persist(&mut self) -> Result<()> {
        self.store.persist(&self.path)?;
        self.stats.record_persist();
        Ok(())
    }
}

impl Drop for CacheState {
    fn drop(&mut self) {
        if !self.deferred.is_empty() {
            warn!(
                "Discarding {} uncommitted deferred entries for {}",
                self.deferred.len(),
                self.path.display()
            );
        }
        if let Err(e) = self.store.persist(&self.path) {
            warn!("Final persist failed: {}", e);
        }
    }
}

// == Cache Handle ==
/// Handle to a file-backed cache.
///
/// Every mutating call rewrites the snapshot file before returning, except
/// [`set_deferred`](Self::set_deferred) and [`save_deferred`](Self::save_deferred),
/// which queue until [`commit`](Self::commit). If a persist fails the in-memory
/// change is kept and the error is returned.
///
/// The last clone to be dropped persists once more.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    path: PathBuf,
    inner: Arc<Mutex<CacheState>>,
}

impl CacheHandle {
    // == Open ==
    /// Opens the cache stored at `path`, creating the file if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = CacheStore::new();
        let loaded = store.load(&path)?;
        info!("Opened cache {} with {} entries", path.display(), loaded);

        let state = CacheState {
            path: path.clone(),
            store,
            deferred: VecDeque::new(),
            stats: CacheStats::new(),
        };
        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(state)),
        })
    }

    /// Path of the snapshot file backing this cache.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if both handles share the same underlying store.
    pub fn shares_state_with(&self, other: &CacheHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // State is plain data, a panic mid-operation leaves nothing to repair
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns the value under `key` decoded into `T`, or `None` if absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_value(key)?
            .map(|value| serde_json::from_value(value).map_err(CacheError::from))
            .transpose()
    }

    /// Returns the value under `key`, or `default` if absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Returns the raw stored value under `key`.
    pub fn get_value(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let mut state = self.lock();
        let value = state.store.get(key).cloned();
        state.stats.record_lookup(value.is_some());
        Ok(value)
    }

    // == Get Multiple ==
    /// Looks up every key in order; missing keys resolve to `default`.
    ///
    /// All keys are validated before any lookup happens.
    pub fn get_multiple<I, K>(&self, keys: I, default: Value) -> Result<Vec<(String, Value)>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = collect_keys(keys)?;
        let mut state = self.lock();
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            let value = state.store.get(&key).cloned();
            state.stats.record_lookup(value.is_some());
            found.push((key, value.unwrap_or_else(|| default.clone())));
        }
        Ok(found)
    }

    // == Has ==
    /// Returns true if `key` has a committed value.
    pub fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.lock().store.contains(key))
    }

    // == Set ==
    /// Stores `value` under `key` and persists.
    ///
    /// `ttl` is accepted for interface compatibility only; entries never expire.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        validate_key(key)?;
        note_ignored_ttl(ttl);
        let value = serde_json::to_value(value)?;

        let mut state = self.lock();
        state.store.insert(key.to_string(), value);
        state.persist()
    }

    // == Set Multiple ==
    /// Stores every pair, then persists once.
    ///
    /// Nothing is applied if any key is invalid or any value fails to serialize.
    pub fn set_multiple<I, K, T>(&self, values: I, ttl: Option<Duration>) -> Result<()>
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Serialize,
    {
        note_ignored_ttl(ttl);
        let pairs = values
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect::<Vec<(String, T)>>();
        for (key, _) in &pairs {
            validate_key(key)?;
        }
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| -> Result<(String, Value)> {
                Ok((key, serde_json::to_value(value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.lock();
        for (key, value) in pairs {
            state.store.insert(key, value);
        }
        state.persist()
    }

    // == Delete ==
    /// Removes `key` and persists. Removing a missing key is not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut state = self.lock();
        state.store.remove(key);
        state.persist()
    }

    /// Removes every key, then persists once. Nothing is removed if any key is invalid.
    pub fn delete_multiple<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = collect_keys(keys)?;
        let mut state = self.lock();
        for key in &keys {
            state.store.remove(key);
        }
        state.persist()
    }

    // == Clear ==
    /// Empties the store and persists. Deferred entries stay queued.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        state.store.clear();
        state.persist()
    }

    // == Deferred ==
    /// Queues `value` under `key` without touching the store or the file.
    pub fn set_deferred<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        validate_key(key)?;
        let value = serde_json::to_value(value)?;
        self.lock().deferred.push_back((key.to_string(), value));
        Ok(())
    }

    /// Applies queued entries in order, then persists once.
    ///
    /// Returns how many entries were committed. An empty queue is a no-op.
    pub fn commit(&self) -> Result<usize> {
        let mut state = self.lock();
        if state.deferred.is_empty() {
            return Ok(0);
        }

        let mut count = 0;
        while let Some((key, value)) = state.deferred.pop_front() {
            state.store.insert(key, value);
            count += 1;
        }
        state.stats.record_commit(count);
        debug!("Committed {} deferred entries", count);
        state.persist()?;
        Ok(count)
    }

    /// Number of entries waiting for [`commit`](Self::commit).
    pub fn pending(&self) -> usize {
        self.lock().deferred.len()
    }

    // == Persist ==
    /// Rewrites the snapshot file from the current contents.
    pub fn persist(&self) -> Result<()> {
        self.lock().persist()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.store.len();
        stats.pending = state.deferred.len();
        stats
    }

    // == Close ==
    /// Persists and releases this handle.
    ///
    /// Other clones stay usable; the shared state is dropped with the last one.
    pub fn close(self) -> Result<()> {
        self.persist()?;
        let stats = self.stats();
        debug!(
            "Cache {} served {} lookups at hit rate {:.2}",
            self.path.display(),
            stats.hits + stats.misses,
            stats.hit_rate()
        );
        info!("Closed cache {}", self.path.display());
        Ok(())
    }

    // == Item Pool ==
    /// Strict lookup returning the stored item.
    pub fn get_item(&self, key: &str) -> Result<Item> {
        self.get_value(key)?
            .map(|value| Item::new(key, value))
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))
    }

    /// Returns one item per key; misses come back as `null` items that are not hits.
    pub fn get_items<I, K>(&self, keys: I) -> Result<Vec<Item>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = collect_keys(keys)?;
        let mut state = self.lock();
        let items = keys
            .into_iter()
            .map(|key| {
                let value = state.store.get(&key).cloned();
                state.stats.record_lookup(value.is_some());
                match value {
                    Some(value) => Item::new(key, value),
                    None => Item::miss(key),
                }
            })
            .collect();
        Ok(items)
    }

    /// Same as [`has`](Self::has).
    pub fn has_item(&self, key: &str) -> Result<bool> {
        self.has(key)
    }

    /// Same as [`delete`](Self::delete).
    pub fn delete_item(&self, key: &str) -> Result<()> {
        self.delete(key)
    }

    /// Same as [`delete_multiple`](Self::delete_multiple).
    pub fn delete_items<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.delete_multiple(keys)
    }

    /// Stores the item's value under its key and persists.
    pub fn save<C: CacheItem + ?Sized>(&self, item: &C) -> Result<()> {
        self.set(item.key(), item.value(), None)
    }

    /// Queues the item until [`commit`](Self::commit).
    pub fn save_deferred<C: CacheItem + ?Sized>(&self, item: &C) -> Result<()> {
        self.set_deferred(item.key(), item.value())
    }
}

/// Validates every key before anything is applied.
fn collect_keys<I, K>(keys: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter()
        .map(|key| -> Result<String> {
            let key = key.as_ref();
            validate_key(key)?;
            Ok(key.to_string())
        })
        .collect()
}

fn note_ignored_ttl(ttl: Option<Duration>) {
    if let Some(ttl) = ttl {
        debug!("Ignoring ttl of {:?}, entries never expire", ttl);
    }
}
