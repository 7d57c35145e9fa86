//! Error types for the migration engine
//!
//! Provides error handling for:
//! - Permission failures before any step runs
//! - Failing migration steps
//! - Schema skew (stored version newer than the app)
//! - Invalid step registration and session misuse

use crate::session::DialogState;
use homepage_storage::StorageError;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Underlying storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Principal may not run migrations
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A migration step failed; later steps were not run
    #[error("{name}: {source}")]
    StepFailed {
        /// Version of the failing step
        version: u32,
        /// Name of the failing step
        name: String,
        /// Error returned by the step
        #[source]
        source: anyhow::Error,
    },

    /// Step list is malformed
    #[error("invalid migration registry: {0}")]
    InvalidRegistry(String),

    /// Stored schema is newer than every known migration
    #[error(
        "the database version ({storage_version}) is greater than the app version ({app_version})"
    )]
    AppOutOfDate {
        /// Version recorded in storage
        storage_version: u32,
        /// Highest version this build knows
        app_version: u32,
    },

    /// Session driven through a transition it does not allow
    #[error("illegal session transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: DialogState,
        /// Requested state
        to: DialogState,
    },
}

impl MigrationError {
    /// Lift a storage error, classifying permission failures
    #[must_use]
    pub fn from_storage(error: StorageError) -> Self {
        match error {
            StorageError::PermissionDenied(message) => Self::PermissionDenied(message),
            other => Self::Storage(other),
        }
    }

    /// Check if a retry of the run can succeed without a code change
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StepFailed { .. } | Self::Storage(_))
    }

    /// Check if only an app update can resolve the error
    #[inline]
    #[must_use]
    pub fn requires_code_update(&self) -> bool {
        matches!(self, Self::AppOutOfDate { .. })
    }
}

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
