//! Landing node use cases

use crate::access::{update_landings, User};
use crate::error::LandingResult;
use crate::model::{LandingNode, PersistedTreeNode};
use crate::reconcile::{
    extract_children_nodes, update_landing_node, update_landing_pages,
    validate_no_duplicated_node, validate_parents_in_same_landing_tree,
};
use crate::repository::LandingNodeRepository;
use crate::settings::ConfigRepository;
use std::sync::Arc;

/// Edit an existing node or add a single section, sub-section or category
///
/// The merged forest is validated before it is saved; a forest with
/// repeated ids or misplaced children is never persisted.
#[derive(Clone)]
pub struct UpdateLandingNodeUseCase {
    repository: Arc<dyn LandingNodeRepository>,
}

impl UpdateLandingNodeUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(repository: Arc<dyn LandingNodeRepository>) -> Self {
        Self { repository }
    }

    /// Merge `node` (with its subtree) into the stored forest
    ///
    /// # Errors
    /// - `LandingError::Forest` for an invalid creation or a forest failing
    ///   validation
    /// - `LandingError::Storage` / `LandingError::Decode` from the repository
    pub async fn execute(&self, node: &LandingNode) -> LandingResult<()> {
        let forest = self.repository.get_persisted_landing_pages().await?;
        let items = extract_children_nodes(node, node.parent());

        let updated = update_landing_pages(forest, items)?;
        let valid = validate_parents_in_same_landing_tree(validate_no_duplicated_node(&updated)?)?;

        self.repository.save(valid).await
    }
}

/// Merge imported records into the stored forest
#[derive(Clone)]
pub struct ImportLandingNodesUseCase {
    repository: Arc<dyn LandingNodeRepository>,
}

impl ImportLandingNodesUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(repository: Arc<dyn LandingNodeRepository>) -> Self {
        Self { repository }
    }

    /// Import `items`, returning them
    ///
    /// When some of the records are already stored only those are updated;
    /// otherwise the records become a new tree.
    ///
    /// # Errors
    /// Any repository error
    pub async fn execute(&self, items: Vec<PersistedTreeNode>) -> LandingResult<Vec<PersistedTreeNode>> {
        let forest = self.repository.get_persisted_landing_pages().await?;
        let merged = update_landing_node(forest, items.clone(), true)?;

        tracing::info!(records = items.len(), trees = merged.len(), "imported landing nodes");
        self.repository.save(&merged).await?;

        Ok(items)
    }
}

/// Landing pages as one user sees them
#[derive(Clone)]
pub struct ListUserLandingPagesUseCase {
    landings: Arc<dyn LandingNodeRepository>,
    config: Arc<dyn ConfigRepository>,
}

impl ListUserLandingPagesUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(landings: Arc<dyn LandingNodeRepository>, config: Arc<dyn ConfigRepository>) -> Self {
        Self { landings, config }
    }

    /// Every landing page with the nodes hidden from `user` removed
    ///
    /// # Errors
    /// Any repository error
    pub async fn execute(&self, user: &User) -> LandingResult<Vec<LandingNode>> {
        let landings = self.landings.get_all().await?;
        let permissions = self.config.get_landing_page_permissions().await?;

        Ok(update_landings(landings, &permissions, user))
    }
}
