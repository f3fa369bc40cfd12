//! The two-tier cache service

use crate::error::Result;
use crate::fetcher::{HttpImageFetcher, ImageFetcher};
use crate::types::{CacheConfig, CacheStats, ImageLoadOptions};
use api_response_cache::{FileMedium, KeyValueMedium, ResponseCache};
use expiring_store::BoundedExpiringStore;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use image_blob_cache::ImageBlobCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

/// JPEG quality used when re-encoding fetched images for the cache.
const CACHE_JPEG_QUALITY: u8 = 80;

/// Single access point over both cache tiers
///
/// Owns the API response cache and the image blob cache exclusively; no
/// other component writes to their backends. Constructed once at startup
/// and passed by reference to consumers, so tests can inject fake media
/// and fetchers.
pub struct CacheService<M: KeyValueMedium, F: ImageFetcher> {
    responses: ResponseCache<M>,
    images: ImageBlobCache,
    fetcher: F,
}

impl CacheService<FileMedium, HttpImageFetcher> {
    /// Open a service with file-backed tiers under `config.cache_dir` and
    /// the default HTTP fetcher.
    pub async fn open(config: CacheConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| crate::error::CacheServiceError::Init(e.to_string()))?;

        let medium = FileMedium::open(config.cache_dir.join("api-responses.json"))
            .map_err(|e| crate::error::CacheServiceError::Init(e.to_string()))?;

        let images = ImageBlobCache::new(config.cache_dir.join("images"));
        images
            .init()
            .await
            .map_err(|e| crate::error::CacheServiceError::Init(e.to_string()))?;

        info!(cache_dir = ?config.cache_dir, "Cache service opened");

        Ok(Self::new(
            ResponseCache::new(medium),
            images,
            HttpImageFetcher::new(),
        ))
    }
}

impl<M: KeyValueMedium, F: ImageFetcher> CacheService<M, F> {
    /// Compose a service from explicitly constructed tiers and fetcher.
    pub fn new(responses: ResponseCache<M>, images: ImageBlobCache, fetcher: F) -> Self {
        Self {
            responses,
            images,
            fetcher,
        }
    }

    /// Look up a cached API response. Absent, expired, or unreadable
    /// entries all come back as `None`.
    pub fn get_cached_api_response<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.responses.get(key)
    }

    /// Cache an API response under a caller-constructed key.
    pub fn set_cached_api_response<T: Serialize>(&self, key: &str, value: &T) {
        self.responses.set(key, value);
    }

    /// Look up a cached image blob by source URL.
    pub async fn get_cached_image(&self, url: &str) -> Option<Vec<u8>> {
        self.images.get(url).await
    }

    /// Cache an image blob under its source URL.
    pub async fn set_cached_image(&self, url: &str, blob: &[u8]) {
        self.images.put(url, blob).await;
    }

    /// Load an image, serving from the cache when possible.
    ///
    /// On a cache hit the stored bytes are decoded and returned. On a miss
    /// the image is fetched over the network, re-encoded as JPEG, written
    /// into the cache (the write completes before this call resolves), and
    /// returned. A fetch or decode failure substitutes the fallback from
    /// `options` when one is supplied; otherwise it propagates — the only
    /// errors this service ever surfaces.
    pub async fn load_image_with_cache(
        &self,
        url: &str,
        options: ImageLoadOptions,
    ) -> Result<DynamicImage> {
        if let Some(bytes) = self.images.get(url).await {
            match image::load_from_memory(&bytes) {
                Ok(img) => {
                    debug!(url, "Image served from cache");
                    return Ok(img);
                }
                Err(e) => {
                    warn!(url, error = %e, "Cached image not decodable, refetching");
                    self.images.remove(url).await;
                }
            }
        }

        let img = match self.fetch_and_decode(url).await {
            Ok(img) => img,
            Err(e) => {
                if let Some(create_fallback) = options.create_fallback {
                    warn!(url, error = %e, "Image load failed, substituting fallback");
                    return Ok(create_fallback());
                }
                return Err(e);
            }
        };

        // Best-effort cache write; an encode failure only costs the cache
        // entry, never the loaded image.
        match encode_jpeg(&img) {
            Ok(jpeg) => self.images.put(url, &jpeg).await,
            Err(e) => warn!(url, error = %e, "Failed to encode image for caching"),
        }

        Ok(img)
    }

    async fn fetch_and_decode(&self, url: &str) -> Result<DynamicImage> {
        let bytes = self.fetcher.fetch(url).await?;
        let img = image::load_from_memory(&bytes)?;
        Ok(img)
    }

    /// Entry counts for both tiers plus the shared bound.
    pub async fn cache_stats(&self) -> CacheStats {
        CacheStats {
            api_cache_size: self.responses.entry_count(),
            image_cache_size: self.images.entry_count().await,
            max_cache_size: self.responses.max_entries(),
        }
    }

    /// Unconditionally empty both tiers.
    pub async fn clear_all(&self) {
        info!("Clearing all caches");
        self.responses.clear_namespace();
        self.images.clear().await;
    }
}

fn encode_jpeg(img: &DynamicImage) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, CACHE_JPEG_QUALITY);
    // JPEG has no alpha channel; flatten before encoding.
    encoder.encode_image(&img.to_rgb8())?;
    Ok(buf)
}
