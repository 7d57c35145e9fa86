//! Error types for storage backends

use std::path::PathBuf;

/// Errors raised by a [`Storage`](crate::Storage) implementation
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error reading or writing the backing file
    #[error("io error on {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored value does not match the requested shape
    #[error("invalid value for key '{key}': {source}")]
    Serialization {
        /// Key being read or written
        key: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Current principal is not allowed to perform the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create serialization error for key
    pub fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            source,
        }
    }

    /// Check if the error is a permission failure
    #[inline]
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_error_display() {
        let err = StorageError::PermissionDenied("no ALL authority".to_string());
        assert_eq!(err.to_string(), "permission denied: no ALL authority");
        assert!(err.is_permission_denied());
    }

    #[test]
    fn serialization_error_names_key() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = StorageError::serialization("migrations", source);
        assert!(err.to_string().contains("'migrations'"));
        assert!(!err.is_permission_denied());
    }
}
