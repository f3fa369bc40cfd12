//! Error types for the key-value medium

use std::fmt;

/// Errors that can occur inside a [`KeyValueMedium`]
///
/// These never escape the cache's public API; the cache logs them and
/// degrades to a miss (reads) or triggers eviction (writes).
///
/// [`KeyValueMedium`]: crate::KeyValueMedium
#[derive(Debug)]
pub enum MediumError {
    /// The medium's capacity limit would be exceeded by the write
    QuotaExceeded { needed: usize, quota: usize },
    /// Underlying I/O failure
    Io(Box<std::io::Error>),
    /// The medium's stored document could not be serialized or parsed
    Corrupt(String),
}

impl fmt::Display for MediumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotaExceeded { needed, quota } => {
                write!(f, "Quota exceeded: {} bytes needed, {} allowed", needed, quota)
            }
            Self::Io(e) => write!(f, "Medium IO error: {}", e),
            Self::Corrupt(msg) => write!(f, "Medium corrupt: {}", msg),
        }
    }
}

impl std::error::Error for MediumError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediumError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Box::new(e))
    }
}

impl From<serde_json::Error> for MediumError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Result type for key-value medium operations
pub type Result<T> = std::result::Result<T, MediumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_display() {
        let err = MediumError::QuotaExceeded {
            needed: 120,
            quota: 100,
        };
        assert_eq!(
            format!("{}", err),
            "Quota exceeded: 120 bytes needed, 100 allowed"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let err: MediumError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(format!("{}", err).contains("read-only"));
    }

    #[test]
    fn test_corrupt_display() {
        let err = MediumError::Corrupt("unexpected end of input".to_string());
        assert!(format!("{}", err).contains("unexpected end of input"));
    }
}
