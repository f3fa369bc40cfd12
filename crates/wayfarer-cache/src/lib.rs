//! Wayfarer cache service - two-tier response and image caching
//!
//! Composes the API response cache (key-value tier) and the image blob
//! cache (binary tier) behind one service, and adds a network-fallback
//! image loader with a bounded fetch timeout. Cache faults are invisible
//! to callers; only real content unavailability (a failed fetch or decode
//! with no fallback) surfaces as an error.

mod error;
mod fetcher;
mod service;
mod types;

pub use error::{CacheServiceError, FetchError, Result};
pub use fetcher::{HttpImageFetcher, ImageFetcher, FETCH_TIMEOUT};
pub use service::CacheService;
pub use types::{CacheConfig, CacheStats, FallbackImage, ImageLoadOptions};

pub use api_response_cache::{FileMedium, KeyValueMedium, MemoryMedium, ResponseCache};
pub use expiring_store::{BoundedExpiringStore, EvictionPolicy, DEFAULT_MAX_ENTRIES};
pub use image_blob_cache::{BlobCacheStats, ImageBlobCache};
