//! Home Page Storage
//!
//! The key/value collaborator that both the migration engine and the landing
//! page repository persist through.
//!
//! # Overview
//!
//! - **Storage**: object-safe async trait over raw JSON values
//! - **StorageExt**: typed get/save helpers available on every storage
//! - **DebugSink**: progress callback handed to migrations and permission checks
//! - **InMemoryStorage** / **JsonFileStorage**: bundled backends
//!
//! # Example
//!
//! ```rust
//! use homepage_storage::{InMemoryStorage, StorageExt};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), homepage_storage::StorageError> {
//! let storage = InMemoryStorage::new();
//!
//! // Missing keys are created with the default value
//! let pages: Vec<String> = storage.get_or_create("landing-pages", Vec::new()).await?;
//! assert!(pages.is_empty());
//! assert!(storage.contains_key("landing-pages"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod debug;
pub mod error;
pub mod file;
pub mod memory;
pub mod storage;

// Re-exports
pub use debug::{DebugLog, DebugSink};
pub use error::{StorageError, StorageResult};
pub use file::JsonFileStorage;
pub use memory::InMemoryStorage;
pub use storage::{Storage, StorageExt, SUPERUSER_AUTHORITY};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for storage consumers
    pub use crate::{DebugSink, Storage, StorageError, StorageExt, StorageResult};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
