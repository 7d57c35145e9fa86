//! Home Page Migrations
//!
//! Data-store migration engine: applies an ordered list of versioned steps
//! against a storage namespace exactly once each, tracking the schema version
//! in a `"migrations"` record.
//!
//! # Core Operations
//!
//! - **Plan**: [`MigrationsRunner::init`] reads the schema config and selects
//!   the steps newer than the stored version
//! - **Run**: [`MigrationsRunner::execute`] applies them in ascending order,
//!   stopping at the first failure
//! - **Recover**: backup, rollback and cleanup primitives for steps that need
//!   them
//!
//! # Example
//!
//! ```rust
//! use homepage_migrations::{migration, migration_fn, MigrationOutcome, MigrationsRunner};
//! use homepage_storage::InMemoryStorage;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), homepage_migrations::MigrationError> {
//! let steps = vec![migration(1, "Empty migration", migration_fn(|_| async { anyhow::Ok(()) }))];
//! let runner = MigrationsRunner::init(Arc::new(InMemoryStorage::new()), steps).await?;
//!
//! let outcome = runner.execute().await?;
//! assert!(matches!(outcome, MigrationOutcome::Migrated { to: 1, .. }));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backup;
pub mod config;
pub mod error;
pub mod runner;
pub mod session;
pub mod step;

// Re-exports
pub use backup::BackupKey;
pub use config::{MigrationMarker, SchemaConfig, CONFIG_KEY};
pub use error::{MigrationError, MigrationResult};
pub use runner::{MigrationOutcome, MigrationsRunner};
pub use session::{
    allowed_transitions, check_migrations, validate_transition, DialogState, MigrationSession,
    MigrationsState,
};
pub use step::{migration, migration_fn, FnMigration, Migrate, MigrationContext, MigrationStep};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing and running migrations
    pub use crate::{
        migration, migration_fn, Migrate, MigrationContext, MigrationError, MigrationOutcome,
        MigrationStep, MigrationsRunner, SchemaConfig,
    };
    pub use homepage_storage::{DebugSink, Storage, StorageExt};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
