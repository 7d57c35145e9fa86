//! Migration runner
//!
//! Brings a storage namespace from its recorded schema version to the latest
//! known version by applying each pending step exactly once, in ascending
//! version order.
//!
//! # Run protocol
//!
//! ```text
//! save {version: v, migration: {version: last}}   marker
//! has_permission()                                  abort on failure
//! for step in pending (ascending):
//!     step.migrate(ctx)                             on failure: save marker + error, stop
//! save {version: last}                              marker cleared
//! ```
//!
//! The two writes are not atomic; a crash in between leaves the marker behind
//! for [`MigrationsRunner::roll_back_existing_backup`] to pick up.

use crate::backup::BackupKey;
use crate::config::{SchemaConfig, CONFIG_KEY};
use crate::error::{MigrationError, MigrationResult};
use crate::step::{MigrationContext, MigrationStep};
use futures::future::try_join_all;
use homepage_storage::{DebugSink, Storage, StorageExt, StorageResult};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Result of a completed `execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Nothing was pending
    UpToDate {
        /// Version recorded in storage
        version: u32,
    },
    /// Pending steps were applied
    Migrated {
        /// Version before the run
        from: u32,
        /// Version after the run
        to: u32,
        /// Names of the applied steps, in order
        applied: Vec<String>,
    },
}

/// Runner bound to one storage namespace and one step list
#[derive(Clone)]
pub struct MigrationsRunner {
    storage: Arc<dyn Storage>,
    config: SchemaConfig,
    steps: Vec<MigrationStep>,
    pending: Vec<MigrationStep>,
    last_version: u32,
    debug: DebugSink,
}

impl MigrationsRunner {
    /// Load the schema config (creating it at version 0) and plan the run
    ///
    /// # Errors
    /// - `MigrationError::InvalidRegistry` if a step has version 0 or two
    ///   steps share a version
    /// - `MigrationError::Storage` if the config cannot be read
    pub async fn init(storage: Arc<dyn Storage>, steps: Vec<MigrationStep>) -> MigrationResult<Self> {
        validate_registry(&steps)?;

        let config = storage
            .get_or_create(CONFIG_KEY, SchemaConfig::default())
            .await?;

        Ok(Self::from_parts(storage, config, steps, DebugSink::default()))
    }

    fn from_parts(
        storage: Arc<dyn Storage>,
        config: SchemaConfig,
        steps: Vec<MigrationStep>,
        debug: DebugSink,
    ) -> Self {
        let last_version = steps.iter().map(MigrationStep::version).max().unwrap_or(0);
        let pending = pending_steps(&steps, &config);

        Self {
            storage,
            config,
            steps,
            pending,
            last_version,
            debug,
        }
    }

    /// Same runner reporting progress to `debug`
    #[must_use]
    pub fn with_debug(mut self, debug: DebugSink) -> Self {
        self.debug = debug;
        self
    }

    /// Config as read at construction
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Version recorded in storage
    #[inline]
    #[must_use]
    pub fn current_storage_version(&self) -> u32 {
        self.config.version
    }

    /// Highest version among the registered steps (0 when none)
    #[inline]
    #[must_use]
    pub fn last_migration_version(&self) -> u32 {
        self.last_version
    }

    /// Steps that a run would apply, ascending
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[MigrationStep] {
        &self.pending
    }

    /// Check if stored and known versions differ
    #[inline]
    #[must_use]
    pub fn has_pending_migrations(&self) -> bool {
        self.config.version != self.last_version
    }

    /// Check if storage was migrated by a newer app
    #[inline]
    #[must_use]
    pub fn is_app_out_of_date(&self) -> bool {
        self.config.version > self.last_version
    }

    /// Fail with the schema skew error when storage is newer than this app
    ///
    /// # Errors
    /// `MigrationError::AppOutOfDate`
    pub fn ensure_compatible(&self) -> MigrationResult<()> {
        if self.is_app_out_of_date() {
            Err(MigrationError::AppOutOfDate {
                storage_version: self.config.version,
                app_version: self.last_version,
            })
        } else {
            Ok(())
        }
    }

    /// Re-read the config from storage and apply whatever is pending
    ///
    /// # Errors
    /// Any error of [`init`](Self::init) or [`run_migrations`](Self::run_migrations)
    pub async fn execute(&self) -> MigrationResult<MigrationOutcome> {
        let runner = Self::init(Arc::clone(&self.storage), self.steps.clone())
            .await?
            .with_debug(self.debug.clone());

        runner.migrate_from_current().await
    }

    /// Apply the pending steps planned at construction
    ///
    /// # Errors
    /// Any error of [`run_migrations`](Self::run_migrations)
    pub async fn migrate_from_current(&self) -> MigrationResult<MigrationOutcome> {
        if self.pending.is_empty() {
            self.debug.emit(format!(
                "No migrations pending to run (current version: {})",
                self.config.version
            ));
            return Ok(MigrationOutcome::UpToDate {
                version: self.config.version,
            });
        }

        self.debug.emit(format!(
            "Migrate: version {} to version {}",
            self.current_storage_version(),
            self.last_version
        ));

        let config = self.run_migrations(&self.pending).await?;

        Ok(MigrationOutcome::Migrated {
            from: self.config.version,
            to: config.version,
            applied: self.pending.iter().map(|s| s.name().to_string()).collect(),
        })
    }

    /// Apply `steps` in order, recording progress in the schema config
    ///
    /// # Errors
    /// - `MigrationError::PermissionDenied` before any step runs
    /// - `MigrationError::StepFailed` for the first failing step; the failure
    ///   is persisted in the config marker and no later step runs; it is
    ///   returned even when that marker write fails
    /// - `MigrationError::Storage` if the in-progress or final config write
    ///   fails
    pub async fn run_migrations(&self, steps: &[MigrationStep]) -> MigrationResult<SchemaConfig> {
        tracing::info!(
            from = self.config.version,
            to = self.last_version,
            steps = steps.len(),
            "running migrations"
        );

        self.storage
            .save_object(CONFIG_KEY, &self.config.in_progress(self.last_version))
            .await?;

        self.storage
            .has_permission(&self.debug)
            .await
            .map_err(MigrationError::from_storage)?;

        let ctx = MigrationContext::new(Arc::clone(&self.storage), self.debug.clone());

        for step in steps {
            self.debug.emit(step.label());

            if let Err(source) = step.run(ctx.clone()).await {
                let message = format!("{}: {source}", step.name());
                tracing::error!(version = step.version(), "migration failed: {message}");

                if let Err(error) = self.save_failure(message).await {
                    tracing::warn!(
                        version = step.version(),
                        "failed to record migration failure: {error}"
                    );
                }
                return Err(MigrationError::StepFailed {
                    version: step.version(),
                    name: step.name().to_string(),
                    source,
                });
            }
        }

        let config = SchemaConfig::at(self.last_version);
        self.storage.save_object(CONFIG_KEY, &config).await?;

        tracing::info!(version = config.version, "migrations completed");
        Ok(config)
    }

    // Backup primitives are not invoked by the run itself; a step opts in.

    /// Snapshot every data key into its backup slot
    ///
    /// # Errors
    /// `MigrationError::Storage` on the first failing read or write
    pub async fn backup_data_store(&self) -> MigrationResult<Vec<BackupKey>> {
        self.debug.emit("Backup data store");

        let keys = self.storage.get_keys().await?;
        let mut backups = Vec::new();

        for key in keys.into_iter().filter(|k| BackupKey::should_back_up(k)) {
            let value = self.read_or_empty(&key).await?;
            let backup = BackupKey::for_key(key);
            self.storage.save_value(&backup.storage_key(), value).await?;
            backups.push(backup);
        }

        Ok(backups)
    }

    /// Backup slots currently present in storage
    ///
    /// # Errors
    /// `MigrationError::Storage` if keys cannot be listed
    pub async fn backup_keys(&self) -> MigrationResult<Vec<BackupKey>> {
        let keys = self.storage.get_keys().await?;
        Ok(keys.iter().filter_map(|k| BackupKey::parse(k)).collect())
    }

    /// Restore every backup slot and record `error` in the config marker
    ///
    /// Without backups this is a no-op returning the current config.
    ///
    /// # Errors
    /// `MigrationError::Storage` on the first failing read or write
    pub async fn rollback_data_store(&self, error: impl fmt::Display) -> MigrationResult<SchemaConfig> {
        let backups = self.backup_keys().await?;
        if backups.is_empty() {
            return Ok(self.config.clone());
        }

        let message = error.to_string();
        self.debug.emit(format!("Error: {message}"));
        self.debug.emit("Start rollback");
        tracing::warn!(backups = backups.len(), "rolling back data store: {message}");

        for backup in &backups {
            let value = self.read_or_empty(&backup.storage_key()).await?;
            self.storage.save_value(backup.original_key(), value).await?;
            self.storage.delete(&backup.storage_key()).await?;
        }

        self.save_failure(message).await
    }

    /// Remove every backup slot; failures are logged, never returned
    pub async fn delete_backup(&self) {
        if let Err(error) = self.try_delete_backup().await {
            self.debug.emit("Error deleting backup (non-fatal)");
            tracing::warn!("error deleting backup: {error}");
        }
    }

    async fn try_delete_backup(&self) -> MigrationResult<()> {
        let backups = self.backup_keys().await?;
        self.debug.emit("Delete backup entries");

        let storage = &self.storage;
        try_join_all(backups.iter().map(|backup| async move {
            storage.delete(&backup.storage_key()).await
        }))
        .await?;

        Ok(())
    }

    /// Roll back when the config still carries a marker from an unfinished run
    ///
    /// # Errors
    /// Any error of [`rollback_data_store`](Self::rollback_data_store)
    pub async fn roll_back_existing_backup(&self) -> MigrationResult<Option<SchemaConfig>> {
        if !self.config.is_in_progress() {
            return Ok(None);
        }

        self.rollback_data_store("Rollback existing backup")
            .await
            .map(Some)
    }

    async fn save_failure(&self, message: String) -> MigrationResult<SchemaConfig> {
        let config = self.config.failed(self.last_version, message);
        self.storage.save_object(CONFIG_KEY, &config).await?;
        Ok(config)
    }

    async fn read_or_empty(&self, key: &str) -> StorageResult<Value> {
        Ok(self
            .storage
            .get_value(key)
            .await?
            .unwrap_or_else(|| json!({})))
    }
}

impl fmt::Debug for MigrationsRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationsRunner")
            .field("config", &self.config)
            .field("last_version", &self.last_version)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

fn validate_registry(steps: &[MigrationStep]) -> MigrationResult<()> {
    let mut seen = HashSet::new();

    for step in steps {
        if step.version() == 0 {
            return Err(MigrationError::InvalidRegistry(format!(
                "migration '{}' has version 0",
                step.name()
            )));
        }
        if !seen.insert(step.version()) {
            return Err(MigrationError::InvalidRegistry(format!(
                "duplicated migration version {}",
                step.version()
            )));
        }
    }

    Ok(())
}

fn pending_steps(steps: &[MigrationStep], config: &SchemaConfig) -> Vec<MigrationStep> {
    let mut pending: Vec<MigrationStep> = steps
        .iter()
        .filter(|s| s.version() > config.version)
        .cloned()
        .collect();
    pending.sort_by_key(MigrationStep::version);
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{migration, migration_fn};
    use homepage_storage::{DebugLog, InMemoryStorage};
    use pretty_assertions::assert_eq;

    fn noop_step(version: u32) -> MigrationStep {
        migration(version, format!("step {version}"), migration_fn(|_| async { anyhow::Ok(()) }))
    }

    #[tokio::test]
    async fn init_creates_config_at_zero() {
        let storage = Arc::new(InMemoryStorage::new());
        let runner = MigrationsRunner::init(storage.clone(), vec![noop_step(2), noop_step(1)])
            .await
            .unwrap();

        assert_eq!(storage.raw(CONFIG_KEY), Some(json!({ "version": 0 })));
        assert_eq!(runner.last_migration_version(), 2);
        assert_eq!(
            runner.pending().iter().map(MigrationStep::version).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(runner.has_pending_migrations());
    }

    #[tokio::test]
    async fn registry_rejects_duplicates_and_zero() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());

        let err = MigrationsRunner::init(Arc::clone(&storage), vec![noop_step(1), noop_step(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidRegistry(_)));

        let err = MigrationsRunner::init(storage, vec![noop_step(0)]).await.unwrap_err();
        assert!(matches!(err, MigrationError::InvalidRegistry(_)));
    }

    #[tokio::test]
    async fn no_steps_means_version_zero_and_nothing_pending() {
        let storage = Arc::new(InMemoryStorage::new());
        let runner = MigrationsRunner::init(storage, Vec::new()).await.unwrap();

        assert_eq!(runner.last_migration_version(), 0);
        assert!(!runner.has_pending_migrations());
        assert_eq!(
            runner.execute().await.unwrap(),
            MigrationOutcome::UpToDate { version: 0 }
        );
    }

    #[tokio::test]
    async fn out_of_date_app_is_detected() {
        let storage = Arc::new(
            InMemoryStorage::new().with_entry(CONFIG_KEY, json!({ "version": 5 })),
        );
        let runner = MigrationsRunner::init(storage.clone(), vec![noop_step(1), noop_step(3)])
            .await
            .unwrap();

        assert!(runner.has_pending_migrations());
        assert!(runner.is_app_out_of_date());
        assert!(runner.ensure_compatible().unwrap_err().requires_code_update());

        // Nothing pending: the stored version never goes backwards
        runner.execute().await.unwrap();
        assert_eq!(storage.raw(CONFIG_KEY), Some(json!({ "version": 5 })));
    }

    #[tokio::test]
    async fn backup_and_rollback_restore_data() {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_entry(CONFIG_KEY, json!({ "version": 0, "migration": { "version": 1 } }))
                .with_entry("landing-pages", json!([["original"]])),
        );
        let log = DebugLog::new();
        let runner = MigrationsRunner::init(storage.clone(), vec![noop_step(1)])
            .await
            .unwrap()
            .with_debug(log.sink());

        let backups = runner.backup_data_store().await.unwrap();
        assert_eq!(backups, vec![BackupKey::for_key("landing-pages")]);
        assert_eq!(storage.raw("backup-landing-pages"), Some(json!([["original"]])));
        assert!(storage.raw("backup-migrations").is_none());

        storage
            .save_value("landing-pages", json!([["changed"]]))
            .await
            .unwrap();

        let config = runner.roll_back_existing_backup().await.unwrap().unwrap();
        assert_eq!(config.last_error(), Some("Rollback existing backup"));
        assert_eq!(storage.raw("landing-pages"), Some(json!([["original"]])));
        assert!(runner.backup_keys().await.unwrap().is_empty());
        assert!(log.contains("Start rollback"));
    }

    #[tokio::test]
    async fn rollback_without_backups_is_noop() {
        let storage = Arc::new(InMemoryStorage::new());
        let runner = MigrationsRunner::init(storage.clone(), vec![noop_step(1)])
            .await
            .unwrap();

        let config = runner.rollback_data_store("whatever").await.unwrap();
        assert_eq!(&config, runner.config());
        assert_eq!(storage.raw(CONFIG_KEY), Some(json!({ "version": 0 })));
    }

    #[tokio::test]
    async fn delete_backup_removes_only_backups() {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_entry("landing-pages", json!([]))
                .with_entry("backup-landing-pages", json!([]))
                .with_entry("backup-settings", json!({})),
        );
        let runner = MigrationsRunner::init(storage.clone(), Vec::new()).await.unwrap();

        runner.delete_backup().await;

        let keys = storage.get_keys().await.unwrap();
        assert_eq!(keys, vec!["landing-pages".to_string(), CONFIG_KEY.to_string()]);
    }
}
