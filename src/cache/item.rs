//! Cache Item Module
//!
//! Key/value wrapper used by the item-pool surface of the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

// == Cache Item Trait ==
/// Anything the pool can save: a key and a serializable value.
pub trait CacheItem {
    /// The key the item is stored under.
    fn key(&self) -> &str;

    /// The value to store.
    fn value(&self) -> &Value;
}

// == Item ==
/// A single cache item with its lookup outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    key: String,
    value: Value,
    hit: bool,
}

impl Item {
    // == Constructor ==
    /// Creates an item ready to be saved.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            hit: true,
        }
    }

    /// Creates an item from any serializable value.
    pub fn from_serialize<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        Ok(Self::new(key, serde_json::to_value(value)?))
    }

    /// Placeholder returned for a key that was not found. Holds `null`.
    pub(crate) fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Value::Null,
            hit: false,
        }
    }

    /// Decodes the value into `T`.
    pub fn get<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.value)?)
    }

    /// Replaces the value. The item must be saved again to take effect.
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }

    /// True if the item was read from the cache rather than synthesized for a miss.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// Consumes the item, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl CacheItem for Item {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> &Value {
        &self.value
    }
}
