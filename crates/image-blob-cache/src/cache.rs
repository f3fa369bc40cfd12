//! Blob storage with on-disk payloads and in-memory metadata

use crate::error::Result;
use crate::types::{BlobCacheStats, BlobEntry};
use chrono::{DateTime, Duration, Utc};
use expiring_store::{BoundedExpiringStore, EvictionPolicy, DEFAULT_MAX_ENTRIES};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Entry metadata with a secondary index on write time
///
/// `by_age` orders entries oldest-first so eviction can take victims without
/// scanning; both structures are kept consistent under one lock.
#[derive(Default)]
struct Index {
    by_url: HashMap<String, BlobEntry>,
    by_age: BTreeSet<(DateTime<Utc>, String)>,
}

impl Index {
    fn insert(&mut self, url: String, entry: BlobEntry) {
        if let Some(prev) = self.by_url.remove(&url) {
            self.by_age.remove(&(prev.stored_at, url.clone()));
        }
        self.by_age.insert((entry.stored_at, url.clone()));
        self.by_url.insert(url, entry);
    }

    fn remove(&mut self, url: &str) -> Option<BlobEntry> {
        let entry = self.by_url.remove(url)?;
        self.by_age.remove(&(entry.stored_at, url.to_string()));
        Some(entry)
    }

    fn drain_oldest_over(&mut self, max: usize) -> Vec<(String, BlobEntry)> {
        let mut victims = Vec::new();
        while self.by_url.len() > max {
            let Some((_, url)) = self.by_age.pop_first() else {
                break;
            };
            if let Some(entry) = self.by_url.remove(&url) {
                victims.push((url, entry));
            }
        }
        victims
    }

    fn drain_all(&mut self) -> Vec<BlobEntry> {
        self.by_age.clear();
        self.by_url.drain().map(|(_, entry)| entry).collect()
    }
}

struct Inner {
    index: RwLock<Index>,
    cache_dir: PathBuf,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Inner {
    async fn remove_entry(&self, url: &str) {
        let entry = {
            let mut index = self.index.write().await;
            index.remove(url)
        };

        if let Some(entry) = entry {
            // Ignore errors; the file may already be gone.
            let _ = fs::remove_file(&entry.path).await;
        }
    }
}

/// A blob cache keyed by source URL
///
/// Payloads live as files under the cache directory (file name is the hex
/// SHA-256 of the URL); metadata lives in memory. Entries expire 24 hours
/// after being written, checked lazily on every read, and a successful write
/// evicts the oldest entries until the count is back under the bound.
///
/// Writes are best-effort: a storage fault is logged and swallowed, never
/// propagated to the caller.
pub struct ImageBlobCache {
    inner: Arc<Inner>,
}

impl Clone for ImageBlobCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ImageBlobCache {
    /// Create a cache with the default policy (24 h TTL, 50 entries).
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_policy(cache_dir, expiring_store::default_ttl(), DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with an explicit TTL and entry bound.
    pub fn with_policy(cache_dir: PathBuf, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: RwLock::new(Index::default()),
                cache_dir,
                max_entries,
                ttl,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Initialize the cache by ensuring the cache directory exists.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.inner.cache_dir).await?;
        info!(cache_dir = ?self.inner.cache_dir, "Image blob cache initialized");
        Ok(())
    }

    /// On-disk file name for a URL's blob.
    pub fn file_name(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Get a cached blob by URL.
    ///
    /// Returns `None` for a missing or expired entry; an expired entry is
    /// deleted on a background task so read latency never waits on the
    /// delete, while the expiry check on every read keeps it logically
    /// absent in the meantime.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let entry = {
            let index = self.inner.index.read().await;
            index.by_url.get(url).cloned()
        };

        let Some(entry) = entry else {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if self.is_expired(entry.stored_at) {
            debug!(url, stored_at = %entry.stored_at, "Cached image expired");
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            self.schedule_remove(url);
            return None;
        }

        match fs::read(&entry.path).await {
            Ok(data) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                debug!(url, "Image cache hit");
                Some(data)
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to read cached blob, dropping entry");
                self.inner.remove_entry(url).await;
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a blob under `url`, overwriting any prior entry.
    ///
    /// After a successful write the oldest entries are evicted until the
    /// count is back under the bound. Storage faults are logged and
    /// swallowed.
    pub async fn put(&self, url: &str, data: &[u8]) {
        if let Err(e) = self.try_put(url, data).await {
            warn!(url, error = %e, "Failed to cache image blob");
            return;
        }
        self.enforce_bound().await;
    }

    async fn try_put(&self, url: &str, data: &[u8]) -> Result<()> {
        let path = self.inner.cache_dir.join(Self::file_name(url));
        fs::write(&path, data).await?;

        let entry = BlobEntry {
            path,
            stored_at: Utc::now(),
        };

        {
            let mut index = self.inner.index.write().await;
            index.insert(url.to_string(), entry);
        }

        debug!(url, size = data.len(), "Cached image blob");
        Ok(())
    }

    /// Remove the blob for `url` if present. Idempotent.
    pub async fn remove(&self, url: &str) {
        self.inner.remove_entry(url).await;
    }

    /// Current number of cached blobs.
    pub async fn entry_count(&self) -> usize {
        self.inner.index.read().await.by_url.len()
    }

    /// Remove every cached blob.
    pub async fn clear(&self) {
        let entries = {
            let mut index = self.inner.index.write().await;
            index.drain_all()
        };

        info!(count = entries.len(), "Cleared image blob cache");
        for entry in entries {
            let _ = fs::remove_file(&entry.path).await;
        }
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> BlobCacheStats {
        BlobCacheStats {
            entries: self.entry_count().await,
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    fn schedule_remove(&self, url: &str) {
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        tokio::spawn(async move {
            inner.remove_entry(&url).await;
        });
    }

    async fn enforce_bound(&self) {
        let victims = {
            let mut index = self.inner.index.write().await;
            index.drain_oldest_over(self.inner.max_entries)
        };

        for (url, entry) in victims {
            debug!(url = %url, stored_at = %entry.stored_at, "Evicted oldest image blob");
            let _ = fs::remove_file(&entry.path).await;
        }
    }
}

impl BoundedExpiringStore for ImageBlobCache {
    type Key = str;

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy::OldestFirst
    }

    fn max_entries(&self) -> usize {
        self.inner.max_entries
    }

    fn expiry_window(&self) -> Duration {
        self.inner.ttl
    }

    async fn remove(&self, url: &str) {
        self.inner.remove_entry(url).await;
    }

    async fn len(&self) -> usize {
        ImageBlobCache::entry_count(self).await
    }

    async fn clear(&self) {
        ImageBlobCache::clear(self).await;
    }
}
