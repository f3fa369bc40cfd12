//! URL-keyed binary blob cache with TTL expiration and oldest-first eviction
//!
//! Stores image blobs as files under a cache directory with in-memory
//! metadata, a secondary index on write time for oldest-first eviction, and
//! lazy 24-hour expiry on read. Write failures are logged and swallowed;
//! a cache fault is never allowed to break the caller.

mod cache;
mod error;
mod types;

pub use cache::ImageBlobCache;
pub use error::{BlobCacheError, Result};
pub use types::BlobCacheStats;
