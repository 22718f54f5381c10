//! Run Cache - A file-persisted key-value cache for test runs
//!
//! Shares cached values across test invocations within a single run by
//! keeping one snapshot file per cache identity. Not meant as a general
//! purpose cache: there is no expiration, no eviction and no cross-process
//! locking.

pub mod cache;
pub mod config;
pub mod error;
pub mod registry;

pub use cache::{CacheHandle, CacheItem, CacheStats, Item};
pub use config::Config;
pub use error::{CacheError, Result};
pub use registry::{CacheRegistry, Identifier};
