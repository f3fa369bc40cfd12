//! Error types for the image blob cache

use std::fmt;

/// Errors that can occur inside the blob cache
///
/// Only [`ImageBlobCache::init`] surfaces these; read and write faults on
/// the steady-state path are logged and degrade to a miss.
///
/// [`ImageBlobCache::init`]: crate::ImageBlobCache::init
#[derive(Debug)]
pub enum BlobCacheError {
    /// Underlying filesystem failure
    Io(Box<std::io::Error>),
}

impl fmt::Display for BlobCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Blob cache IO error: {}", e),
        }
    }
}

impl std::error::Error for BlobCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for BlobCacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

/// Result type for blob cache operations
pub type Result<T> = std::result::Result<T, BlobCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err: BlobCacheError =
            std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(format!("{}", err), "Blob cache IO error: disk full");
    }

    #[test]
    fn test_io_error_has_source() {
        let err: BlobCacheError =
            std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(std::error::Error::source(&err).is_some());
    }
}
