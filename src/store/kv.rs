//! Durable key-value storage for the three persisted records.
//!
//! [`FileStore`] keeps one file per key.  Writes land in a temporary sibling
//! file that is then renamed over the target, so a reader sees either the
//! previous snapshot or the new one, never a partial write.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the record failed.
    #[error("storage I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialised.
    #[error("cannot encode `{key}`: {reason}")]
    Encode { key: String, reason: String },
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// String-valued durable storage.
///
/// `set` must replace the whole value atomically.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Handle shared by the credential, style and history stores.
pub type SharedStore = Arc<dyn KeyValueStore>;

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(io_error(key))?;

        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&staging, value).map_err(io_error(key))?;
        std::fs::rename(&staging, &target).map_err(io_error(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_get_missing_is_none() {
        let dir = tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());
        assert!(store.get("credential").unwrap().is_none());
    }

    #[test]
    fn file_store_set_creates_dir_and_overwrites() {
        let dir = tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("nested").join("data"));

        store.set("style_examples", "first").unwrap();
        store.set("style_examples", "second").unwrap();

        assert_eq!(store.get("style_examples").unwrap().as_deref(), Some("second"));
        // No staging file is left behind.
        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_store_remove_is_idempotent() {
        let dir = tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());

        store.set("alert_history", "[]").unwrap();
        store.remove("alert_history").unwrap();
        store.remove("alert_history").unwrap();
        assert!(store.get("alert_history").unwrap().is_none());
    }

    #[test]
    fn keys_are_independent() {
        let dir = tempdir().expect("temp dir");
        let store = FileStore::new(dir.path());

        store.set("credential", "abc123").unwrap();
        store.set("style_examples", "ejemplo").unwrap();
        store.remove("credential").unwrap();

        assert!(store.get("credential").unwrap().is_none());
        assert_eq!(store.get("style_examples").unwrap().as_deref(), Some("ejemplo"));
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn shared_store_is_object_safe() {
        let _: SharedStore = Arc::new(MemoryStore::new());
    }
}
