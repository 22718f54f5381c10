//! Snapshot Module
//!
//! Whole-file encoding of the cache contents.
//!
//! A snapshot is a compact JSON document:
//!
//! ```text
//! {"entries":{"a":1,"b":{"nested":[true,null]}},"format":"run_cache","version":1}
//! ```
//!
//! Entries live in a `BTreeMap` and `serde_json` objects are sorted maps, so the
//! same contents always encode to the same bytes.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{CacheError, Result};

/// Format marker written into every snapshot.
pub const SNAPSHOT_FORMAT: &str = "run_cache";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Key/value contents of a snapshot.
pub type Entries = BTreeMap<String, Value>;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    entries: &'a Entries,
    format: &'static str,
    version: u32,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    entries: Entries,
    format: String,
    version: u32,
}

// == Encode ==
/// Serializes the full mapping into snapshot bytes.
pub fn encode(entries: &Entries) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        entries,
        format: SNAPSHOT_FORMAT,
        version: SNAPSHOT_VERSION,
    };
    Ok(serde_json::to_vec(&snapshot)?)
}

// == Decode ==
/// Parses snapshot bytes read from `path`.
///
/// Any parse failure, foreign format marker or unknown version is reported as
/// [`CacheError::CorruptState`].
pub fn decode(path: &Path, bytes: &[u8]) -> Result<Entries> {
    let corrupt = |reason: String| CacheError::CorruptState {
        path: path.to_path_buf(),
        reason,
    };

    let snapshot: SnapshotOwned =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;

    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(corrupt(format!(
            "unexpected format marker '{}'",
            snapshot.format
        )));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(corrupt(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    Ok(snapshot.entries)
}

// == Write File ==
/// Replaces `path` with `bytes` atomically, then relaxes permissions.
///
/// The bytes go to a temp file in the same directory, which is synced and
/// renamed over `path`. Readers see either the old or the new snapshot.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source: io::Error| CacheError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    temp.write_all(bytes).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;
    temp.persist(path).map_err(|e| io_error(e.error))?;

    relax_permissions(path);
    Ok(())
}

/// Best-effort chmod 0666 so other users of the run can share the file.
#[cfg(unix)]
fn relax_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o666)) {
        trace!("Ignoring permission change failure on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn relax_permissions(path: &Path) {
    trace!("Skipping permission change on {}", path.display());
}
