//! Sub-command handlers
//!
//! Each handler works on an already opened storage namespace and returns the
//! text to print on stdout.

use anyhow::{bail, Context};
use homepage_landing::{
    landing_migrations, ImportLandingNodesUseCase, LandingError, LandingNodeDefaultRepository,
    LandingNodeRepository, PersistedTreeNode,
};
use homepage_migrations::{check_migrations, DialogState, MigrationSession, MigrationsRunner, MigrationsState};
use homepage_storage::Storage;
use std::path::Path;
use std::sync::Arc;

/// Schema version, pending steps and leftovers of earlier runs
///
/// # Errors
/// Storage failures
pub async fn status(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let runner = MigrationsRunner::init(storage, landing_migrations()).await?;
    let config = runner.config();

    let mut lines = vec![
        format!("Storage version: {}", runner.current_storage_version()),
        format!("App version: {}", runner.last_migration_version()),
    ];

    if runner.is_app_out_of_date() {
        lines.push("App is out of date: storage was migrated by a newer version".to_string());
    } else if runner.pending().is_empty() {
        lines.push("No migrations pending".to_string());
    } else {
        lines.push("Pending migrations:".to_string());
        lines.extend(runner.pending().iter().map(|step| format!("  {}", step.label())));
    }

    if config.is_in_progress() {
        match config.last_error() {
            Some(error) => lines.push(format!("Last run failed: {error}")),
            None => lines.push("Last run did not finish".to_string()),
        }
    }

    let backups = runner.backup_keys().await?;
    if !backups.is_empty() {
        lines.push(format!("Backup slots: {}", backups.len()));
    }

    Ok(lines.join("\n"))
}

/// Run pending migrations through a migration session
///
/// # Errors
/// Storage newer than the app, or a failed run (its log is attached)
pub async fn migrate(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let runner = match check_migrations(storage, landing_migrations()).await? {
        MigrationsState::Pending(runner) => runner,
        MigrationsState::Checking | MigrationsState::Checked => {
            return Ok("No migrations pending".to_string());
        }
    };

    let mut session = MigrationSession::new(runner);
    if session.state() == DialogState::AppOutOfDate {
        bail!(session.summary());
    }

    tracing::info!("{}", session.summary());
    let state = session.start().await?;
    let log = session.messages().join("\n");

    if state == DialogState::Success {
        Ok(log)
    } else {
        let error = session.last_error().unwrap_or("unknown error").to_string();
        Err(anyhow::anyhow!(error).context(format!("migration failed\n{log}")))
    }
}

/// Copy every data key into its backup slot
///
/// # Errors
/// Storage failures
pub async fn backup_create(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let runner = MigrationsRunner::init(storage, landing_migrations()).await?;
    let backups = runner.backup_data_store().await?;

    let keys: Vec<&str> = backups.iter().map(|b| b.original_key()).collect();
    Ok(format!("Backed up {} keys: {}", keys.len(), keys.join(", ")))
}

/// Restore every backup slot, recording the rollback in the schema config
///
/// # Errors
/// Storage failures
pub async fn backup_rollback(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let runner = MigrationsRunner::init(storage, landing_migrations()).await?;
    let restored = runner.backup_keys().await?.len();

    if restored == 0 {
        return Ok("No backup to roll back".to_string());
    }

    runner.rollback_data_store("Manual rollback").await?;
    Ok(format!("Restored {restored} keys"))
}

/// Remove every backup slot
///
/// # Errors
/// Storage failures while opening the runner; deletion errors are only logged
pub async fn backup_delete(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let runner = MigrationsRunner::init(storage, landing_migrations()).await?;
    runner.delete_backup().await;
    Ok("Backup deleted".to_string())
}

async fn landing_repository(storage: Arc<dyn Storage>) -> anyhow::Result<LandingNodeDefaultRepository> {
    let runner = MigrationsRunner::init(storage.clone(), landing_migrations()).await?;
    runner.ensure_compatible()?;

    if runner.has_pending_migrations() {
        bail!(
            "storage is at version {} but the app needs version {}, run `homepage migrate` first",
            runner.current_storage_version(),
            runner.last_migration_version()
        );
    }

    Ok(LandingNodeDefaultRepository::new(storage))
}

/// Every landing page tree, as JSON
///
/// # Errors
/// Pending migrations or storage failures
pub async fn landing_list(storage: Arc<dyn Storage>) -> anyhow::Result<String> {
    let repository = landing_repository(storage).await?;
    let landings = repository.get_all().await?;
    Ok(serde_json::to_string_pretty(&landings)?)
}

/// One node with its subtree, as JSON
///
/// # Errors
/// Unknown id, pending migrations or storage failures
pub async fn landing_show(storage: Arc<dyn Storage>, id: &str) -> anyhow::Result<String> {
    let repository = landing_repository(storage).await?;
    let node = repository
        .get_by_id(id)
        .await?
        .ok_or_else(|| LandingError::NotFound(id.to_string()))?;
    Ok(serde_json::to_string_pretty(&node)?)
}

/// Delete nodes with their subtrees
///
/// # Errors
/// Trees without root, pending migrations or storage failures
pub async fn landing_delete(storage: Arc<dyn Storage>, ids: &[String]) -> anyhow::Result<String> {
    let repository = landing_repository(storage).await?;
    repository.delete_nodes(ids).await?;
    Ok(format!("Deleted {}", ids.join(", ")))
}

/// Append the records of a JSON file as a new tree
///
/// # Errors
/// Unreadable file, invalid records, pending migrations or storage failures
pub async fn landing_import(storage: Arc<dyn Storage>, file: &Path) -> anyhow::Result<String> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let items: Vec<PersistedTreeNode> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of landing nodes", file.display()))?;

    if items.is_empty() {
        bail!("{} holds no landing nodes", file.display());
    }

    let repository = Arc::new(landing_repository(storage).await?);
    let imported = ImportLandingNodesUseCase::new(repository).execute(items).await?;

    Ok(format!("Imported {} nodes", imported.len()))
}

/// Flat records of nodes and their subtrees, printed or written to `out`
///
/// # Errors
/// Unknown id, unwritable file, pending migrations or storage failures
pub async fn landing_export(
    storage: Arc<dyn Storage>,
    ids: &[String],
    out: Option<&Path>,
    compact: bool,
) -> anyhow::Result<String> {
    let repository = landing_repository(storage).await?;
    let records = repository.export(ids).await?;

    let json = if compact {
        serde_json::to_string(&records)?
    } else {
        serde_json::to_string_pretty(&records)?
    };

    match out {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(format!("Exported {} nodes to {}", records.len(), path.display()))
        }
        None => Ok(json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homepage_landing::{Forest, LANDING_PAGES_KEY};
    use homepage_migrations::CONFIG_KEY;
    use homepage_storage::{InMemoryStorage, JsonFileStorage};
    use homepage_test_utils::{valid_landing_pages_tree, ROOT_ID, SECOND_ROOT_ID, SECTION_ID, SUB_SECTION_ID};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn migrated_store() -> Arc<InMemoryStorage> {
        Arc::new(
            InMemoryStorage::new()
                .with_entry(CONFIG_KEY, json!({ "version": 2 }))
                .with_entry(
                    LANDING_PAGES_KEY,
                    serde_json::to_value(valid_landing_pages_tree()).unwrap(),
                ),
        )
    }

    #[tokio::test]
    async fn status_lists_pending_steps_of_fresh_store() {
        let output = status(Arc::new(InMemoryStorage::new())).await.unwrap();

        assert!(output.contains("Storage version: 0"));
        assert!(output.contains("App version: 2"));
        assert!(output.contains("02 - Remove duplicated nodes and children nodes out of place"));
    }

    #[tokio::test]
    async fn status_reports_failed_run() {
        let storage = Arc::new(InMemoryStorage::new().with_entry(
            CONFIG_KEY,
            json!({ "version": 1, "migration": { "version": 2, "error": "Step: boom" } }),
        ));

        let output = status(storage).await.unwrap();
        assert!(output.contains("Last run failed: Step: boom"));
    }

    #[tokio::test]
    async fn migrate_brings_store_to_app_version() {
        let storage = Arc::new(InMemoryStorage::new());

        let log = migrate(storage.clone()).await.unwrap();

        assert!(log.contains("Migrate: version 0 to version 2"));
        assert_eq!(storage.raw(CONFIG_KEY), Some(json!({ "version": 2 })));
        assert_eq!(migrate(storage).await.unwrap(), "No migrations pending");
    }

    #[tokio::test]
    async fn migrate_refuses_newer_store() {
        let storage = Arc::new(InMemoryStorage::new().with_entry(CONFIG_KEY, json!({ "version": 9 })));

        let err = migrate(storage).await.unwrap_err();
        assert!(err.to_string().contains("greater than the app version"));
    }

    #[tokio::test]
    async fn landing_commands_require_migrated_store() {
        let err = landing_list(Arc::new(InMemoryStorage::new())).await.unwrap_err();
        assert!(err.to_string().contains("run `homepage migrate` first"));
    }

    #[tokio::test]
    async fn show_prints_subtree_and_rejects_unknown_id() {
        let storage = migrated_store();

        let output = landing_show(storage.clone(), SECTION_ID).await.unwrap();
        assert!(output.contains(SUB_SECTION_ID));

        let err = landing_show(storage, "missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn delete_then_list() {
        let storage = migrated_store();

        landing_delete(storage.clone(), &[ROOT_ID.to_string()]).await.unwrap();
        let listed: serde_json::Value = serde_json::from_str(&landing_list(storage).await.unwrap()).unwrap();

        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["id"], json!(SECOND_ROOT_ID));
    }

    #[tokio::test]
    async fn export_file_imports_back_as_new_tree() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("export.json");
        let source = migrated_store();

        let message = landing_export(source, &[ROOT_ID.to_string()], Some(&file), false)
            .await
            .unwrap();
        assert_eq!(message, format!("Exported 3 nodes to {}", file.display()));

        let target = Arc::new(InMemoryStorage::new().with_entry(CONFIG_KEY, json!({ "version": 2 })));
        let output = landing_import(target.clone(), &file).await.unwrap();
        assert_eq!(output, "Imported 3 nodes");

        let stored: Forest = serde_json::from_value(target.raw(LANDING_PAGES_KEY).unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.trees()[0].nodes()[0].id, ROOT_ID);
    }

    #[tokio::test]
    async fn import_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.json");
        std::fs::write(&file, "[]").unwrap();

        let err = landing_import(migrated_store(), &file).await.unwrap_err();
        assert!(err.to_string().contains("holds no landing nodes"));
    }

    #[tokio::test]
    async fn backup_round_trip_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> =
            Arc::new(JsonFileStorage::new(dir.path().join("store.json"), "home-page-app"));

        migrate(storage.clone()).await.unwrap();
        let created = backup_create(storage.clone()).await.unwrap();
        assert_eq!(created, format!("Backed up 1 keys: {LANDING_PAGES_KEY}"));

        assert_eq!(backup_rollback(storage.clone()).await.unwrap(), "Restored 1 keys");
        assert_eq!(
            backup_rollback(storage.clone()).await.unwrap(),
            "No backup to roll back"
        );
        assert_eq!(backup_delete(storage).await.unwrap(), "Backup deleted");
    }
}
