//! Configuration Module
//!
//! Resolves where cache files live, loading overrides from environment variables.

use std::env;
use std::path::PathBuf;

/// Default extension appended to client ids when building a storage path.
pub const DEFAULT_FILE_EXTENSION: &str = "cache";

/// Cache storage configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding one snapshot file per client id
    pub storage_dir: PathBuf,
    /// Extension of snapshot files, without the leading dot
    pub file_extension: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RUN_CACHE_DIR` - Directory for cache files (default: system temp dir)
    /// - `RUN_CACHE_EXTENSION` - Snapshot file extension (default: `cache`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_dir: env::var("RUN_CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            file_extension: env::var("RUN_CACHE_EXTENSION")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.file_extension),
        }
    }

    /// Returns a Config rooted at `storage_dir` with the default extension.
    pub fn with_storage_dir(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            ..Self::default()
        }
    }

    /// Builds the snapshot path for a client id: `<storage_dir>/<client>.<ext>`.
    pub fn path_for_client(&self, client: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{}.{}", client, self.file_extension))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: env::temp_dir(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }
}
