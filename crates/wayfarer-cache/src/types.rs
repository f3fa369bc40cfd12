//! Cache service types

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Statistics across both cache tiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entry count in the API response cache namespace
    pub api_cache_size: usize,
    /// Entry count in the image blob cache
    pub image_cache_size: usize,
    /// Entry bound shared by both tiers
    pub max_cache_size: usize,
}

/// Configuration for the cache service
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding both tiers' persistent state
    pub cache_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
        }
    }
}

/// Factory for a substitute image when the network load fails.
pub type FallbackImage = Box<dyn FnOnce() -> DynamicImage + Send>;

/// Options for [`CacheService::load_image_with_cache`]
///
/// [`CacheService::load_image_with_cache`]: crate::CacheService::load_image_with_cache
#[derive(Default)]
pub struct ImageLoadOptions {
    /// Invoked (at most once) to substitute an image when the fetch or
    /// decode fails. Without it the failure propagates to the caller.
    pub create_fallback: Option<FallbackImage>,
}

impl ImageLoadOptions {
    /// Options with a fallback factory.
    pub fn with_fallback(create_fallback: impl FnOnce() -> DynamicImage + Send + 'static) -> Self {
        Self {
            create_fallback: Some(Box::new(create_fallback)),
        }
    }
}
