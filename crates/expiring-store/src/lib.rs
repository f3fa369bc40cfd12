//! Shared contract for the bounded, expiring cache tiers
//!
//! Both cache tiers store entries with a write timestamp, drop entries past a
//! fixed expiry window on read, and keep the entry count under a bound. They
//! differ only in how they shed excess entries, so that difference is modeled
//! as an explicit [`EvictionPolicy`] behind one [`BoundedExpiringStore`]
//! interface rather than two unrelated implementations.

use chrono::{DateTime, Duration, Utc};

/// Maximum entry count shared by both cache tiers.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Expiry window shared by both cache tiers (24 hours).
pub const DEFAULT_TTL_SECS: i64 = 24 * 60 * 60;

/// The default expiry window as a [`Duration`].
pub fn default_ttl() -> Duration {
    Duration::seconds(DEFAULT_TTL_SECS)
}

/// How a bounded store sheds entries once its bound is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Delete every entry in the store's namespace and let it repopulate.
    ///
    /// Used when the backing medium cannot cheaply enumerate entries by age.
    FlushAll,
    /// Delete the oldest entries (by write time) until back under the bound.
    OldestFirst,
}

/// A capacity-bounded store whose entries expire a fixed window after being
/// written.
///
/// An entry is logically absent once `now - stored_at` exceeds the expiry
/// window, whether or not it has been physically purged. Timestamps are set
/// once at write time and never refreshed on read, so eviction order is
/// insertion order, not access order.
///
/// The read/write operations stay on the concrete types because the two tiers
/// carry different payloads (JSON text vs. raw blobs); this trait captures the
/// contract they share.
#[allow(async_fn_in_trait)]
pub trait BoundedExpiringStore {
    type Key: ?Sized;

    /// The policy applied when the entry count exceeds [`max_entries`].
    ///
    /// [`max_entries`]: BoundedExpiringStore::max_entries
    fn eviction_policy(&self) -> EvictionPolicy;

    /// Maximum number of entries the store is allowed to retain.
    fn max_entries(&self) -> usize;

    /// Age past which an entry is treated as absent.
    fn expiry_window(&self) -> Duration;

    /// Whether an entry written at `stored_at` has passed the expiry window.
    fn is_expired(&self, stored_at: DateTime<Utc>) -> bool {
        Utc::now() - stored_at > self.expiry_window()
    }

    /// Remove the entry for `key` if present. Idempotent.
    async fn remove(&self, key: &Self::Key);

    /// Current number of physically stored entries.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry in the store.
    async fn clear(&self);
}
