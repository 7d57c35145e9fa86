//! Migration steps and their execution context
//!
//! Every step receives the storage handle and the debug sink explicitly
//! through [`MigrationContext`]; there is a single call convention.

use async_trait::async_trait;
use homepage_storage::{DebugSink, Storage};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Handles a step works with
#[derive(Clone)]
pub struct MigrationContext {
    /// Namespace being migrated
    pub storage: Arc<dyn Storage>,
    /// Progress sink
    pub debug: DebugSink,
}

impl MigrationContext {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, debug: DebugSink) -> Self {
        Self { storage, debug }
    }

    /// Emit a progress message
    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.debug.emit(message);
    }
}

impl fmt::Debug for MigrationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationContext").finish_non_exhaustive()
    }
}

/// Body of a migration step
#[async_trait]
pub trait Migrate: Send + Sync {
    /// Apply the step
    async fn migrate(&self, ctx: MigrationContext) -> anyhow::Result<()>;
}

/// Closure-backed [`Migrate`], built with [`migration_fn`]
pub struct FnMigration<F>(F);

#[async_trait]
impl<F, Fut> Migrate for FnMigration<F>
where
    F: Fn(MigrationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn migrate(&self, ctx: MigrationContext) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }
}

/// Build a step body from an async closure
///
/// ```rust
/// use homepage_migrations::{migration, migration_fn};
///
/// let step = migration(1, "Empty migration", migration_fn(|ctx| async move {
///     ctx.debug("nothing to do");
///     anyhow::Ok(())
/// }));
/// assert_eq!(step.version(), 1);
/// ```
pub fn migration_fn<F, Fut>(f: F) -> FnMigration<F>
where
    F: Fn(MigrationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnMigration(f)
}

/// Versioned, immutable migration step
#[derive(Clone)]
pub struct MigrationStep {
    version: u32,
    name: String,
    task: Arc<dyn Migrate>,
}

impl MigrationStep {
    /// Create new step
    #[must_use]
    pub fn new(version: u32, name: impl Into<String>, task: impl Migrate + 'static) -> Self {
        Self {
            version,
            name: name.into(),
            task: Arc::new(task),
        }
    }

    /// Step version
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Step name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"Apply migration 01 - name"`
    #[must_use]
    pub fn label(&self) -> String {
        format!("Apply migration {:02} - {}", self.version, self.name)
    }

    /// Run the step body
    pub async fn run(&self, ctx: MigrationContext) -> anyhow::Result<()> {
        self.task.migrate(ctx).await
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Register a step; shorthand for [`MigrationStep::new`]
#[inline]
#[must_use]
pub fn migration(version: u32, name: impl Into<String>, task: impl Migrate + 'static) -> MigrationStep {
    MigrationStep::new(version, name, task)
}
