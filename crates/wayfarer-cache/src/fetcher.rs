//! Network image fetching

use crate::error::FetchError;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed timeout for image fetches; the only cancellation trigger.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of raw image bytes, keyed by URL
///
/// The service treats the network as opaque: bytes in, decodable image out.
/// Injected so tests can count calls or fail on demand.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// HTTP image fetcher with a bounded request timeout
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Create a fetcher with the default 10 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        debug!(url, "Fetching image");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url, "Image fetch failed");
            return Err(FetchError::Status(response.status()));
        }

        let data = response.bytes().await?.to_vec();
        debug!(url, size = data.len(), "Fetched image");
        Ok(data)
    }
}
