//! Blob cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// In-memory metadata for a cached blob
#[derive(Debug, Clone)]
pub(crate) struct BlobEntry {
    pub path: PathBuf,
    pub stored_at: DateTime<Utc>,
}

/// Statistics about the blob cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}
