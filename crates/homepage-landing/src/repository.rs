//! Landing node repository
//!
//! Reads and writes the forest stored under [`LANDING_PAGES_KEY`]. Reads for
//! display ([`get_all`](LandingNodeRepository::get_all)) skip trees that do
//! not decode; reads that precede a write fail instead, so a bad tree is
//! never silently dropped from storage.

use crate::error::{LandingError, LandingResult};
use crate::forest::{Forest, LandingTree, TreeId};
use crate::model::{find_node, LandingNode, PersistedTreeNode, ROOT_PARENT};
use crate::reconcile::{extract_children_nodes, prune_nodes, update_landing_node};
use async_trait::async_trait;
use homepage_storage::{Storage, StorageExt};
use serde_json::Value;
use std::sync::Arc;

/// Storage key of the forest
pub const LANDING_PAGES_KEY: &str = "landing-pages";

/// Landing page persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandingNodeRepository: Send + Sync {
    /// Materialized landing pages, seeding a default one into an empty store
    async fn get_all(&self) -> LandingResult<Vec<LandingNode>>;

    /// Materialized node with its subtree
    async fn get_by_id(&self, id: &str) -> LandingResult<Option<LandingNode>>;

    /// Stored forest, as is
    async fn get_persisted_landing_pages(&self) -> LandingResult<Forest>;

    /// Store `node` and its children as a new tree
    async fn create(&self, node: &LandingNode) -> LandingResult<()>;

    /// Overwrite the stored forest
    async fn save(&self, forest: &Forest) -> LandingResult<()>;

    /// Remove nodes with their subtrees
    async fn delete_nodes(&self, ids: &[String]) -> LandingResult<()>;

    /// Flat records of the given nodes and their subtrees
    async fn export(&self, ids: &[String]) -> LandingResult<Vec<PersistedTreeNode>>;

    /// Exchange the positions of two nodes
    async fn swap_order(&self, first: &str, second: &str) -> LandingResult<()>;
}

/// [`LandingNodeRepository`] over a [`Storage`] namespace
#[derive(Clone)]
pub struct LandingNodeDefaultRepository {
    storage: Arc<dyn Storage>,
}

impl LandingNodeDefaultRepository {
    /// Create new repository
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn read_raw_trees(&self) -> LandingResult<Vec<Value>> {
        match self.storage.get_value(LANDING_PAGES_KEY).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(LandingError::Malformed),
        }
    }

    async fn save_default_landing_page(&self) -> LandingResult<Vec<LandingNode>> {
        let root = PersistedTreeNode::default_root();
        tracing::info!(id = %root.id, "seeding default landing page");

        let forest = Forest::from(vec![vec![root.clone()]]);
        self.save(&forest).await?;

        Ok(vec![LandingNode::leaf(root)])
    }
}

impl std::fmt::Debug for LandingNodeDefaultRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandingNodeDefaultRepository").finish_non_exhaustive()
    }
}

fn decode_tree(tree: TreeId, raw: Value) -> LandingResult<LandingTree> {
    serde_json::from_value(raw).map_err(|source| LandingError::Decode { tree, source })
}

fn has_raw_root(raw: &[Value]) -> bool {
    raw.iter()
        .filter_map(Value::as_array)
        .flatten()
        .any(|node| node.get("parent").and_then(Value::as_str) == Some(ROOT_PARENT))
}

#[async_trait]
impl LandingNodeRepository for LandingNodeDefaultRepository {
    async fn get_all(&self) -> LandingResult<Vec<LandingNode>> {
        let raw = self.read_raw_trees().await?;

        if !has_raw_root(&raw) {
            return self.save_default_landing_page().await;
        }

        let mut trees = Vec::with_capacity(raw.len());
        for (position, value) in raw.into_iter().enumerate() {
            let tree = TreeId::new(position);
            match decode_tree(tree, value) {
                Ok(decoded) => trees.push(decoded),
                Err(error) => tracing::warn!(%tree, "skipping landing tree: {error}"),
            }
        }

        let forest = Forest::new(trees);
        let index = forest.index();
        let mut landings = Vec::new();

        for root in forest.roots() {
            match index.materialize(root) {
                Ok(landing) => landings.push(landing),
                Err(error) => tracing::warn!(root = %root.id, "skipping landing tree: {error}"),
            }
        }

        Ok(landings)
    }

    async fn get_by_id(&self, id: &str) -> LandingResult<Option<LandingNode>> {
        // Lookup goes through the materialized views so children are populated
        let landings = self.get_all().await?;
        Ok(find_node(&landings, id).cloned())
    }

    async fn get_persisted_landing_pages(&self) -> LandingResult<Forest> {
        let raw = self.read_raw_trees().await?;

        let trees = raw
            .into_iter()
            .enumerate()
            .map(|(position, value)| decode_tree(TreeId::new(position), value))
            .collect::<LandingResult<Vec<_>>>()?;

        Ok(Forest::new(trees))
    }

    async fn create(&self, node: &LandingNode) -> LandingResult<()> {
        let forest = self.get_persisted_landing_pages().await?;
        let items = extract_children_nodes(node, node.parent());

        let updated = update_landing_node(forest, items, true)?;
        self.save(&updated).await
    }

    async fn save(&self, forest: &Forest) -> LandingResult<()> {
        tracing::debug!(trees = forest.len(), "saving landing pages");
        self.storage.save_object(LANDING_PAGES_KEY, forest).await?;
        Ok(())
    }

    async fn delete_nodes(&self, ids: &[String]) -> LandingResult<()> {
        let forest = self.get_persisted_landing_pages().await?;
        let pruned = prune_nodes(&forest, ids)?;

        tracing::info!(
            deleted = ?ids,
            trees_before = forest.len(),
            trees_after = pruned.len(),
            "deleted landing nodes"
        );
        self.save(&pruned).await
    }

    async fn export(&self, ids: &[String]) -> LandingResult<Vec<PersistedTreeNode>> {
        let landings = self.get_all().await?;
        let mut records = Vec::new();

        for id in ids {
            let node = find_node(&landings, id).ok_or_else(|| LandingError::NotFound(id.clone()))?;
            records.extend(extract_children_nodes(node, node.parent()));
        }

        Ok(records)
    }

    async fn swap_order(&self, first: &str, second: &str) -> LandingResult<()> {
        let landings = self.get_all().await?;
        let view_order = |id: &str| {
            find_node(&landings, id)
                .map(|node| node.record.order)
                .ok_or_else(|| LandingError::NotFound(id.to_string()))
        };
        let (first_order, second_order) = (view_order(first)?, view_order(second)?);

        let mut forest = self.get_persisted_landing_pages().await?;
        for tree in forest.trees_mut() {
            for node in tree.nodes_mut() {
                if node.id == first {
                    node.order = second_order;
                } else if node.id == second {
                    node.order = first_order;
                }
            }
        }

        self.save(&forest).await
    }
}
