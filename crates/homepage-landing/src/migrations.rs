//! Data-store migrations of the landing pages

use crate::forest::Forest;
use crate::reconcile::remove_misplaced_nodes;
use crate::repository::LANDING_PAGES_KEY;
use async_trait::async_trait;
use homepage_migrations::{migration, Migrate, MigrationContext, MigrationStep};
use homepage_storage::StorageExt;
use serde_json::{json, Value};

/// Migrations of the app, ascending
#[must_use]
pub fn landing_migrations() -> Vec<MigrationStep> {
    vec![
        migration(1, "Allow multiple landing pages", AllowMultipleLandingPages),
        migration(
            2,
            "Remove duplicated nodes and children nodes out of place",
            RemoveDuplicatedNodes,
        ),
    ]
}

/// Make sure the forest key exists
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowMultipleLandingPages;

#[async_trait]
impl Migrate for AllowMultipleLandingPages {
    async fn migrate(&self, ctx: MigrationContext) -> anyhow::Result<()> {
        ctx.storage
            .get_or_create::<Value>(LANDING_PAGES_KEY, json!([]))
            .await?;
        Ok(())
    }
}

/// Drop repeated ids and children stored outside their parent's tree
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveDuplicatedNodes;

#[async_trait]
impl Migrate for RemoveDuplicatedNodes {
    async fn migrate(&self, ctx: MigrationContext) -> anyhow::Result<()> {
        ctx.debug("Getting landing trees");
        let forest: Forest = ctx
            .storage
            .get_or_create(LANDING_PAGES_KEY, Forest::default())
            .await?;

        let fixed = remove_misplaced_nodes(&forest);
        let removed = forest.nodes().count() - fixed.nodes().count();
        tracing::debug!(removed, "removing misplaced landing nodes");

        ctx.debug("Removing duplicated nodes and children nodes out of place");
        ctx.storage.save_object(LANDING_PAGES_KEY, &fixed).await?;
        Ok(())
    }
}
