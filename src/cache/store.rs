//! Cache Store Module
//!
//! In-memory key/value mapping synchronized with a single snapshot file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::cache::snapshot::{self, Entries};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Authoritative in-memory mapping backing a cache handle.
///
/// Every persist rewrites the whole file, so a write costs O(total size).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStore {
    /// Key-value storage, sorted for deterministic snapshots
    entries: Entries,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Load ==
    /// Replaces the contents with the snapshot at `path`.
    ///
    /// A missing file is created from the current contents instead.
    /// Returns the number of entries loaded.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        match fs::read(path) {
            Ok(bytes) => {
                self.entries = snapshot::decode(path, &bytes)?;
                Ok(self.entries.len())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.persist(path)?;
                Ok(0)
            }
            Err(source) => Err(CacheError::Persistence {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    // == Persist ==
    /// Serializes the whole mapping and overwrites `path`.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let bytes = snapshot::encode(&self.entries)?;
        snapshot::write_file(path, &bytes)?;
        debug!(
            "Persisted {} entries ({} bytes) to {}",
            self.entries.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    // == Get ==
    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Insert ==
    /// Stores `value` under `key`, overwriting any previous value.
    pub fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    // == Remove ==
    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
