//! Key-value stores for cached API responses
//!
//! Provides the `KeyValueStore` capability used by the query client, a
//! `DiskStore` that keeps every entry in a single JSON file, and a
//! `MemoryStore` that lives only as long as the process.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the disk store inside its directory
const STORE_FILE_NAME: &str = "local_storage.json";

/// Errors that can occur when writing to a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The store contents could not be serialized
    #[error("Failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The existing store file could not be parsed; it is left untouched
    #[error("Store file {} is corrupt ({source}); run `etherquery cache clear` to reset it", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A string-keyed store with get/set semantics
///
/// Entries never expire. A `set` on an existing key overwrites it.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// A value as it is written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    stored_at: DateTime<Utc>,
}

/// An entry read back from the disk store, used for listing
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// The cache key
    pub key: String,
    /// The stored response text
    pub value: String,
    /// When the entry was last written
    pub stored_at: DateTime<Utc>,
}

/// Persists entries to a JSON file on disk
///
/// All entries share one file (`~/.cache/etherquery/local_storage.json` on
/// Linux). Writes from this process are serialized by an internal lock; the
/// last write for a key wins.
#[derive(Debug)]
pub struct DiskStore {
    /// Directory holding the store file
    dir: PathBuf,
    lock: Mutex<()>,
}

impl DiskStore {
    /// Creates a DiskStore in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        Self::default_dir().map(Self::with_dir)
    }

    /// The XDG cache directory for etherquery, if one can be determined
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "etherquery")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates a DiskStore in a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE_NAME)
    }

    /// Returns every entry, ordered by key
    pub fn entries(&self) -> Vec<StoredEntry> {
        let _guard = self.guard();
        read_or_empty(&self.path())
            .into_iter()
            .map(|(key, stored)| StoredEntry {
                key,
                value: stored.value,
                stored_at: stored.stored_at,
            })
            .collect()
    }

    /// Removes every entry by deleting the backing file
    pub fn clear(&self) -> io::Result<()> {
        let _guard = self.guard();
        match fs::remove_file(self.path()) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.guard();
        read_or_empty(&self.path()).remove(key).map(|stored| stored.value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.guard();
        let path = self.path();
        // Refuse to rebuild from an unreadable file, that would drop every entry
        let mut entries = read_file(&path)?;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                stored_at: Utc::now(),
            },
        );

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&entries)?;
        // Readers see either the old file or the new one, never a partial write
        let tmp_path = self
            .dir
            .join(format!("{}.{}.tmp", STORE_FILE_NAME, std::process::id()));
        fs::write(&tmp_path, json)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!(path = %path.display(), entries = entries.len(), "wrote disk store");
        Ok(())
    }
}

/// Reads the store file; a missing file is an empty store
fn read_file(path: &Path) -> Result<BTreeMap<String, StoredValue>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the store file for lookups, treating an unreadable file as empty
fn read_or_empty(path: &Path) -> BTreeMap<String, StoredValue> {
    read_file(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring unreadable disk store");
        BTreeMap::new()
    })
}

/// Keeps entries in memory for the lifetime of the store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty MemoryStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.guard().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.guard().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (DiskStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_set_creates_file_in_store_directory() {
        let (store, temp_dir) = create_test_store();

        store.set("key", "{\"status\":\"1\"}").expect("Set should succeed");

        let expected_path = temp_dir.path().join(STORE_FILE_NAME);
        assert!(expected_path.exists(), "Store file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"key\""));
        assert!(content.contains("stored_at"));
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get("nonexistent_key").is_none());
    }

    #[test]
    fn test_get_returns_stored_value() {
        let (store, _temp_dir) = create_test_store();
        store.set("a", "first").unwrap();
        store.set("b", "second").unwrap();

        assert_eq!(store.get("a").as_deref(), Some("first"));
        assert_eq!(store.get("b").as_deref(), Some("second"));
    }

    #[test]
    fn test_overwrite_existing_entry() {
        let (store, _temp_dir) = create_test_store();
        store.set("key", "old").unwrap();
        store.set("key", "new").unwrap();

        assert_eq!(store.get("key").as_deref(), Some("new"));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_entries_survive_new_store_instance() {
        let (store, temp_dir) = create_test_store();
        store.set("persisted", "value").unwrap();
        drop(store);

        let reopened = DiskStore::with_dir(temp_dir.path().to_path_buf());
        assert_eq!(reopened.get("persisted").as_deref(), Some("value"));
    }

    #[test]
    fn test_set_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("store");
        let store = DiskStore::with_dir(nested_path.clone());

        store.set("key", "value").expect("Set should succeed");

        assert!(nested_path.join(STORE_FILE_NAME).exists());
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(store.get("key").is_none());
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_truncated_file_is_not_clobbered_by_set() {
        let (store, _temp_dir) = create_test_store();
        for i in 0..100 {
            store.set(&format!("key{}", i), "{}").unwrap();
        }

        // Simulate an interrupted write from another process
        let content = fs::read(store.path()).unwrap();
        let truncated = &content[..content.len() - 3];
        fs::write(store.path(), truncated).unwrap();

        match store.set("new", "{}") {
            Err(StoreError::Corrupt { path, .. }) => assert_eq!(path, store.path()),
            other => panic!("Expected Corrupt error, got {:?}", other),
        }
        assert_eq!(fs::read(store.path()).unwrap(), truncated);

        // Clearing recovers the store
        store.clear().unwrap();
        store.set("new", "{}").unwrap();
        assert_eq!(store.get("new").as_deref(), Some("{}"));
    }

    #[test]
    fn test_set_leaves_no_temp_files() {
        let (store, temp_dir) = create_test_store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![STORE_FILE_NAME.to_string()]);
    }

    #[test]
    fn test_entries_are_sorted_and_timestamped() {
        let (store, _temp_dir) = create_test_store();
        let before = Utc::now();
        store.set("zeta", "2").unwrap();
        store.set("alpha", "1").unwrap();
        let after = Utc::now();

        let entries = store.entries();
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        for entry in &entries {
            assert!(entry.stored_at >= before && entry.stored_at <= after);
        }
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, _temp_dir) = create_test_store();
        store.set("key", "value").unwrap();

        store.clear().expect("Clear should succeed");
        assert!(store.get("key").is_none());

        // Clearing an already empty store is fine
        store.clear().expect("Second clear should succeed");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = DiskStore::new() {
            let path_str = store.path().to_string_lossy().to_string();
            assert!(path_str.contains("etherquery"));
            assert!(path_str.ends_with(STORE_FILE_NAME));
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("key", "value").unwrap();
        store.set("key", "replaced").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key").as_deref(), Some("replaced"));
        assert!(store.get("other").is_none());
    }
}
