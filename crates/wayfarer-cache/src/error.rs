//! Error types for the cache service

use std::fmt;

/// Errors that can occur when fetching an image from the network
#[derive(Debug)]
pub enum FetchError {
    /// HTTP request failed (includes the 10 s timeout)
    Http(reqwest::Error),
    /// The server answered with a non-success status
    Status(reqwest::StatusCode),
    /// The image source is unreachable for a non-HTTP reason
    Unavailable(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Image fetch failed: {}", e),
            Self::Status(status) => write!(f, "Image fetch returned status {}", status),
            Self::Unavailable(msg) => write!(f, "Image source unavailable: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

/// Errors the cache service can return to callers
///
/// Only the image loader produces these, and only for real content
/// unavailability (network or codec failure). Storage faults inside the
/// cache tiers are logged and degrade to a miss; they never surface here.
#[derive(Debug)]
pub enum CacheServiceError {
    /// Network fetch failed or timed out
    Fetch(FetchError),
    /// Image bytes could not be decoded
    Image(image::ImageError),
    /// Cache backends could not be opened at startup
    Init(String),
}

impl fmt::Display for CacheServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{}", e),
            Self::Image(e) => write!(f, "Image decode error: {}", e),
            Self::Init(msg) => write!(f, "Cache initialization error: {}", msg),
        }
    }
}

impl std::error::Error for CacheServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Init(_) => None,
        }
    }
}

impl From<FetchError> for CacheServiceError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<image::ImageError> for CacheServiceError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

/// Result type for cache service operations
pub type Result<T> = std::result::Result<T, CacheServiceError>;
