//! Cache Registry
//!
//! Maps storage identities to shared cache handles so that repeated lookups
//! of the same identity within a run reuse one store.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::cache::CacheHandle;
use crate::config::Config;
use crate::error::Result;

// == Identifier ==
/// How a caller names a cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Explicit snapshot file path
    Path(PathBuf),
    /// Client id resolved through [`Config::path_for_client`]
    Client(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path {}", path.display()),
            Self::Client(id) => write!(f, "client {}", id),
        }
    }
}

impl From<PathBuf> for Identifier {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

// == Cache Registry ==
/// Registry of open caches, owned by the application entry point.
///
/// Handles are keyed by resolved snapshot path, so a client id and an
/// explicit path naming the same file share one store.
#[derive(Debug, Default)]
pub struct CacheRegistry {
    config: Config,
    handles: HashMap<PathBuf, CacheHandle>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handles: HashMap::new(),
        }
    }

    /// Configuration used to resolve client ids.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves an identifier to its snapshot path.
    pub fn resolve(&self, identifier: &Identifier) -> PathBuf {
        match identifier {
            Identifier::Path(path) => path.clone(),
            Identifier::Client(id) => self.config.path_for_client(id),
        }
    }

    // == Get Instance ==
    /// Returns the handle registered for `identifier`, opening it on first use.
    pub fn get_instance(&mut self, identifier: impl Into<Identifier>) -> Result<CacheHandle> {
        let identifier = identifier.into();
        let path = self.resolve(&identifier);
        if let Some(handle) = self.handles.get(&path) {
            return Ok(handle.clone());
        }

        let handle = CacheHandle::open(path.clone())?;
        debug!("Registered cache for {}", identifier);
        self.handles.insert(path, handle.clone());
        Ok(handle)
    }

    /// Shorthand for [`get_instance`](Self::get_instance) with a client id.
    pub fn for_client(&mut self, client: &str) -> Result<CacheHandle> {
        self.get_instance(Identifier::Client(client.to_string()))
    }

    /// True if a handle is registered for `identifier`.
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.handles.contains_key(&self.resolve(identifier))
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    // == Close All ==
    /// Unregisters and closes every cache.
    ///
    /// Every handle is attempted; the first error is returned.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for (path, handle) in self.handles.drain() {
            if let Err(e) = handle.close() {
                warn!("Failed to close cache {}: {}", path.display(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
