//! Synchronous key-value storage media
//!
//! The cache talks to storage through [`KeyValueMedium`] so tests can inject
//! a fake medium (including one that fails writes on demand via a byte
//! quota). Two media are provided: a single-document JSON file and an
//! in-memory map.

use crate::error::{MediumError, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A synchronous string-keyed, string-valued storage medium
///
/// Calls never suspend; each call is atomic with respect to the rest of the
/// program. Values are opaque strings; the cache layers its own record format
/// on top.
pub trait KeyValueMedium {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any prior value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key`. Idempotent.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;
}

fn lock_entries<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`KeyValueMedium`] persisted as a single JSON document on disk
///
/// The document is read once on open and rewritten synchronously on every
/// mutation. An optional byte quota on the serialized document models the
/// medium's capacity limit: a rewrite that would exceed it fails with
/// [`MediumError::QuotaExceeded`] and leaves the prior contents in place.
pub struct FileMedium {
    path: PathBuf,
    quota_bytes: Option<usize>,
    entries: Mutex<HashMap<String, String>>,
}

impl FileMedium {
    /// Open the medium backed by the JSON document at `path`, with no quota.
    pub fn open(path: PathBuf) -> Result<Self> {
        Self::open_with_quota(path, None)
    }

    /// Open the medium with a byte quota on the serialized document.
    pub fn with_quota(path: PathBuf, quota_bytes: usize) -> Result<Self> {
        Self::open_with_quota(path, Some(quota_bytes))
    }

    fn open_with_quota(path: PathBuf, quota_bytes: Option<usize>) -> Result<Self> {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    // A corrupt document is not fatal; start empty and let
                    // the next write replace it.
                    warn!(path = ?path, error = %e, "Medium document corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = ?path, entries = entries.len(), "Opened file medium");

        Ok(Self {
            path,
            quota_bytes,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let doc = serde_json::to_string(entries)?;

        if let Some(quota) = self.quota_bytes {
            if doc.len() > quota {
                return Err(MediumError::QuotaExceeded {
                    needed: doc.len(),
                    quota,
                });
            }
        }

        std::fs::write(&self.path, doc)?;
        Ok(())
    }
}

impl KeyValueMedium for FileMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(lock_entries(&self.entries).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock_entries(&self.entries);
        let prev = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            // Roll back so the in-memory view matches what is on disk.
            match prev {
                Some(prev) => entries.insert(key.to_string(), prev),
                None => entries.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut entries = lock_entries(&self.entries);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(lock_entries(&self.entries).keys().cloned().collect())
    }
}

/// An in-memory [`KeyValueMedium`] with an optional byte quota
///
/// The quota counts the total bytes of stored keys and values, so tests can
/// make a specific write fail exactly like a full persistent medium would.
#[derive(Default)]
pub struct MemoryMedium {
    quota_bytes: Option<usize>,
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMedium {
    /// Create an unbounded in-memory medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory medium that rejects writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn stored_bytes(entries: &HashMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(lock_entries(&self.entries).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock_entries(&self.entries);

        if let Some(quota) = self.quota_bytes {
            let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed =
                Self::stored_bytes(&entries) - replaced + key.len() + value.len();
            if needed > quota {
                return Err(MediumError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        lock_entries(&self.entries).remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(lock_entries(&self.entries).keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_medium_roundtrip() {
        let medium = MemoryMedium::new();

        medium.set_item("a", "1").unwrap();
        assert_eq!(medium.get_item("a").unwrap(), Some("1".to_string()));

        medium.set_item("a", "2").unwrap();
        assert_eq!(medium.get_item("a").unwrap(), Some("2".to_string()));

        medium.remove_item("a").unwrap();
        assert_eq!(medium.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_memory_medium_remove_is_idempotent() {
        let medium = MemoryMedium::new();
        medium.remove_item("missing").unwrap();
        medium.remove_item("missing").unwrap();
    }

    #[test]
    fn test_memory_medium_quota_rejects_write() {
        let medium = MemoryMedium::with_quota(10);

        medium.set_item("k", "12345").unwrap(); // 6 bytes stored

        let err = medium.set_item("x", "123456789").unwrap_err();
        assert!(matches!(err, MediumError::QuotaExceeded { .. }));

        // The failed write stored nothing.
        assert_eq!(medium.get_item("x").unwrap(), None);
        assert_eq!(medium.get_item("k").unwrap(), Some("12345".to_string()));
    }

    #[test]
    fn test_memory_medium_quota_counts_replacement() {
        let medium = MemoryMedium::with_quota(10);

        medium.set_item("k", "12345").unwrap();
        // Replacing the value frees the old bytes first.
        medium.set_item("k", "123456789").unwrap();
        assert_eq!(medium.get_item("k").unwrap(), Some("123456789".to_string()));
    }

    #[test]
    fn test_file_medium_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("medium.json");

        let medium = FileMedium::open(path.clone()).unwrap();
        medium.set_item("country_fr", "{\"name\":\"France\"}").unwrap();
        drop(medium);

        let reopened = FileMedium::open(path).unwrap();
        assert_eq!(
            reopened.get_item("country_fr").unwrap(),
            Some("{\"name\":\"France\"}".to_string())
        );
    }

    #[test]
    fn test_file_medium_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let medium = FileMedium::open(dir.path().join("absent.json")).unwrap();
        assert!(medium.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_medium_corrupt_document_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("medium.json");
        std::fs::write(&path, "not json at all").unwrap();

        let medium = FileMedium::open(path).unwrap();
        assert!(medium.keys().unwrap().is_empty());
    }

    #[test]
    fn test_file_medium_quota_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("medium.json");
        let medium = FileMedium::with_quota(path, 30).unwrap();

        medium.set_item("k", "small").unwrap();

        let err = medium
            .set_item("big", &"x".repeat(100))
            .unwrap_err();
        assert!(matches!(err, MediumError::QuotaExceeded { .. }));

        // The failed write left the medium untouched, in memory and on disk.
        assert_eq!(medium.get_item("big").unwrap(), None);
        assert_eq!(medium.get_item("k").unwrap(), Some("small".to_string()));
    }

    #[test]
    fn test_file_medium_keys() {
        let dir = tempdir().unwrap();
        let medium = FileMedium::open(dir.path().join("medium.json")).unwrap();

        medium.set_item("a", "1").unwrap();
        medium.set_item("b", "2").unwrap();

        let mut keys = medium.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
