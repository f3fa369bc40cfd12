//! Cache-aside response cache over a key-value medium

use crate::medium::KeyValueMedium;
use chrono::{DateTime, Duration, Utc};
use expiring_store::{BoundedExpiringStore, EvictionPolicy, DEFAULT_MAX_ENTRIES};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Namespace prefix for every key this cache writes into its medium.
const NAMESPACE: &str = "api_cache_";

/// Raw record stored in the medium for each cached value.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// A key-value cache for small JSON-serializable payloads
///
/// Reads check expiry lazily and delete expired records as they are found.
/// Writes overwrite unconditionally with a fresh timestamp. Storage faults
/// never reach the caller: a failed read is a miss, and a failed write
/// triggers a reactive flush of the whole namespace once it has outgrown
/// its bound (the medium cannot cheaply enumerate by age, so wipe-and-
/// repopulate is the correct-enough recovery).
pub struct ResponseCache<M: KeyValueMedium> {
    medium: M,
    ttl: Duration,
    max_entries: usize,
}

impl<M: KeyValueMedium> ResponseCache<M> {
    /// Create a cache with the default policy (24 h TTL, 50 entries).
    pub fn new(medium: M) -> Self {
        Self::with_policy(medium, expiring_store::default_ttl(), DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with an explicit TTL and entry bound.
    pub fn with_policy(medium: M, ttl: Duration, max_entries: usize) -> Self {
        Self {
            medium,
            ttl,
            max_entries,
        }
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", NAMESPACE, key)
    }

    /// Look up a cached value by key.
    ///
    /// Returns `None` for a missing key, an expired record, or any storage
    /// fault; absence is a normal outcome, never an error. Expired records
    /// are deleted on the way out.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = Self::namespaced(key);

        let raw = match self.medium.get_item(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let record: StoredRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(key, error = %e, "Cached record unreadable, dropping");
                self.delete(&full_key);
                return None;
            }
        };

        if self.is_expired(record.stored_at) {
            debug!(key, stored_at = %record.stored_at, "Cache entry expired");
            self.delete(&full_key);
            return None;
        }

        match serde_json::from_value(record.value) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Cached value has wrong shape, treating as miss");
                None
            }
        }
    }

    /// Store a value under `key`, overwriting any prior entry.
    ///
    /// A storage fault is logged and answered with a reactive namespace
    /// flush; it never propagates, so a full medium cannot break the code
    /// path the cache accelerates.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Value not serializable, skipping cache write");
                return;
            }
        };

        let record = StoredRecord {
            value,
            stored_at: Utc::now(),
        };
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Record not serializable, skipping cache write");
                return;
            }
        };

        if let Err(e) = self.medium.set_item(&Self::namespaced(key), &raw) {
            warn!(key, error = %e, "Cache write failed, attempting cleanup");
            self.evict();
        } else {
            debug!(key, "Cached response");
        }
    }

    /// Number of entries currently stored in this cache's namespace.
    pub fn entry_count(&self) -> usize {
        self.namespace_keys().len()
    }

    /// Delete every entry in this cache's namespace.
    pub fn clear_namespace(&self) {
        let keys = self.namespace_keys();
        debug!(count = keys.len(), "Clearing response cache");
        for key in keys {
            self.delete(&key);
        }
    }

    fn namespace_keys(&self) -> Vec<String> {
        match self.medium.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(NAMESPACE))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Failed to enumerate medium keys");
                Vec::new()
            }
        }
    }

    /// Reactive eviction: if the namespace has outgrown its bound, flush it
    /// entirely. Anything short of the bound is left alone; the failed write
    /// is simply lost.
    fn evict(&self) {
        let keys = self.namespace_keys();
        if keys.len() <= self.max_entries {
            return;
        }

        warn!(count = keys.len(), max = self.max_entries, "Flushing response cache namespace");
        for key in keys {
            self.delete(&key);
        }
    }

    fn delete(&self, full_key: &str) {
        if let Err(e) = self.medium.remove_item(full_key) {
            warn!(key = full_key, error = %e, "Failed to delete cache entry");
        }
    }
}

impl<M: KeyValueMedium> BoundedExpiringStore for ResponseCache<M> {
    type Key = str;

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::FlushAll
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn expiry_window(&self) -> Duration {
        self.ttl
    }

    async fn remove(&self, key: &str) {
        self.delete(&Self::namespaced(key));
    }

    async fn len(&self) -> usize {
        self.entry_count()
    }

    async fn clear(&self) {
        self.clear_namespace();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MemoryMedium;
    use serde_json::json;

    fn fresh_cache() -> ResponseCache<MemoryMedium> {
        ResponseCache::new(MemoryMedium::new())
    }

    #[test]
    fn test_get_missing_key_is_miss() {
        let cache = fresh_cache();
        let value: Option<String> = cache.get("countries_fr_photos");
        assert!(value.is_none());
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let cache = fresh_cache();

        cache.set("countries_fr_photos", &json!({"name": "France", "photos": 3}));

        let value: serde_json::Value = cache.get("countries_fr_photos").unwrap();
        assert_eq!(value["name"], "France");
        assert_eq!(value["photos"], 3);
    }

    #[test]
    fn test_set_overwrites_and_refreshes_timestamp() {
        let medium = MemoryMedium::new();
        let cache = ResponseCache::new(medium);

        cache.set("k", &"v1");
        let first: StoredRecord = serde_json::from_str(
            &cache.medium.get_item("api_cache_k").unwrap().unwrap(),
        )
        .unwrap();

        cache.set("k", &"v2");
        let second: StoredRecord = serde_json::from_str(
            &cache.medium.get_item("api_cache_k").unwrap().unwrap(),
        )
        .unwrap();

        assert_eq!(cache.get::<String>("k").unwrap(), "v2");
        assert!(second.stored_at >= first.stored_at);
    }

    #[test]
    fn test_expired_entry_is_miss_and_deleted() {
        let cache = fresh_cache();

        // Plant a record whose timestamp is past the 24 h window.
        let record = StoredRecord {
            value: json!("stale"),
            stored_at: Utc::now() - Duration::hours(25),
        };
        cache
            .medium
            .set_item("api_cache_old", &serde_json::to_string(&record).unwrap())
            .unwrap();

        let value: Option<String> = cache.get("old");
        assert!(value.is_none());

        // The expired record was physically purged.
        assert_eq!(cache.medium.get_item("api_cache_old").unwrap(), None);
    }

    #[test]
    fn test_entry_inside_window_is_hit() {
        let cache = fresh_cache();

        let record = StoredRecord {
            value: json!("still good"),
            stored_at: Utc::now() - Duration::hours(23),
        };
        cache
            .medium
            .set_item("api_cache_recent", &serde_json::to_string(&record).unwrap())
            .unwrap();

        assert_eq!(cache.get::<String>("recent").unwrap(), "still good");
    }

    #[test]
    fn test_unreadable_record_is_dropped() {
        let cache = fresh_cache();
        cache.medium.set_item("api_cache_bad", "{not json").unwrap();

        let value: Option<String> = cache.get("bad");
        assert!(value.is_none());
        assert_eq!(cache.medium.get_item("api_cache_bad").unwrap(), None);
    }

    #[test]
    fn test_failed_write_flushes_full_namespace() {
        // Quota sized so a handful of entries fit, then a write fails.
        let cache = ResponseCache::with_policy(
            MemoryMedium::with_quota(400),
            expiring_store::default_ttl(),
            2,
        );

        cache.set("a", &"1");
        cache.set("b", &"2");
        cache.set("c", &"3");
        assert!(cache.entry_count() >= 3);

        // This write exceeds the quota; the namespace is over its bound of
        // 2, so everything is flushed rather than trimmed.
        cache.set("big", &"x".repeat(500));

        assert_eq!(cache.entry_count(), 0);
        assert!(cache.get::<String>("a").is_none());
        assert!(cache.get::<String>("b").is_none());
        assert!(cache.get::<String>("c").is_none());
    }

    #[test]
    fn test_failed_write_under_bound_keeps_entries() {
        let cache = ResponseCache::with_policy(
            MemoryMedium::with_quota(200),
            expiring_store::default_ttl(),
            50,
        );

        cache.set("a", &"1");
        cache.set("big", &"x".repeat(500));

        // Below the bound nothing is flushed; only the failed write is lost.
        assert_eq!(cache.get::<String>("a").unwrap(), "1");
        assert!(cache.get::<String>("big").is_none());
    }

    #[test]
    fn test_clear_namespace_leaves_foreign_keys() {
        let cache = fresh_cache();
        cache.set("a", &"1");
        cache.medium.set_item("unrelated", "kept").unwrap();

        cache.clear_namespace();

        assert!(cache.get::<String>("a").is_none());
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(
            cache.medium.get_item("unrelated").unwrap(),
            Some("kept".to_string())
        );
    }

    #[test]
    fn test_entry_count_tracks_distinct_keys() {
        let cache = fresh_cache();
        for i in 0..5 {
            cache.set(&format!("key_{}", i), &i);
        }
        cache.set("key_0", &99);
        assert_eq!(cache.entry_count(), 5);
    }

    #[tokio::test]
    async fn test_store_contract() {
        let cache = fresh_cache();
        assert_eq!(cache.eviction_policy(), EvictionPolicy::FlushAll);
        assert_eq!(cache.max_entries(), DEFAULT_MAX_ENTRIES);
        assert_eq!(cache.expiry_window(), Duration::hours(24));

        cache.set("k", &"v");
        assert_eq!(BoundedExpiringStore::len(&cache).await, 1);
        BoundedExpiringStore::remove(&cache, "k").await;
        assert!(cache.is_empty().await);
    }
}
