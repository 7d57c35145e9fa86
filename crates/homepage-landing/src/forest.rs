//! Landing forest and per-operation index
//!
//! A [`Forest`] is the ordered list of landing trees stored under
//! `"landing-pages"`. Each [`LandingTree`] is a flat list of parent-pointer
//! records. Trees are addressed by [`TreeId`] (their position), and a
//! [`ForestIndex`] built once per operation answers id and parent lookups in
//! constant time.
//!
//! Invariants of a consistent forest:
//! - no id appears twice across the forest
//! - every non-root node has its parent in the same tree

use crate::error::{ForestError, ForestResult};
use crate::model::{LandingNode, PersistedTreeNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Deepest level a node may sit below the node being materialized
pub const MAX_TREE_DEPTH: usize = 256;

/// Position of a tree in its forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(usize);

impl TreeId {
    /// Id of the tree at `index`
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the forest
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tree #{}", self.0)
    }
}

/// One landing page and its descendants, as flat records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandingTree {
    nodes: Vec<PersistedTreeNode>,
}

impl LandingTree {
    /// Tree from flat records
    #[inline]
    #[must_use]
    pub fn new(nodes: Vec<PersistedTreeNode>) -> Self {
        Self { nodes }
    }

    /// Records in stored order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[PersistedTreeNode] {
        &self.nodes
    }

    /// Mutable records
    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [PersistedTreeNode] {
        &mut self.nodes
    }

    /// Consume into records
    #[inline]
    #[must_use]
    pub fn into_nodes(self) -> Vec<PersistedTreeNode> {
        self.nodes
    }

    /// Append a record
    #[inline]
    pub fn push(&mut self, node: PersistedTreeNode) {
        self.nodes.push(node);
    }

    /// Root record: the first node typed `root`
    #[must_use]
    pub fn root(&self) -> Option<&PersistedTreeNode> {
        self.nodes
            .iter()
            .find(|n| n.node_type == crate::model::NodeType::Root)
    }

    /// Records with no parent
    pub fn roots(&self) -> impl Iterator<Item = &PersistedTreeNode> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    /// Check if a record with `id` is in this tree
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree has no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl From<Vec<PersistedTreeNode>> for LandingTree {
    fn from(nodes: Vec<PersistedTreeNode>) -> Self {
        Self::new(nodes)
    }
}

/// All landing trees, serialized as `PersistedTreeNode[][]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    trees: Vec<LandingTree>,
}

impl Forest {
    /// Forest from trees
    #[inline]
    #[must_use]
    pub fn new(trees: Vec<LandingTree>) -> Self {
        Self { trees }
    }

    /// Trees in stored order
    #[inline]
    #[must_use]
    pub fn trees(&self) -> &[LandingTree] {
        &self.trees
    }

    /// Consume into trees
    #[inline]
    #[must_use]
    pub fn into_trees(self) -> Vec<LandingTree> {
        self.trees
    }

    /// Tree at `id`
    #[inline]
    #[must_use]
    pub fn tree(&self, id: TreeId) -> Option<&LandingTree> {
        self.trees.get(id.index())
    }

    /// Mutable tree at `id`
    #[inline]
    pub fn tree_mut(&mut self, id: TreeId) -> Option<&mut LandingTree> {
        self.trees.get_mut(id.index())
    }

    /// Trees with their ids
    pub fn iter(&self) -> impl Iterator<Item = (TreeId, &LandingTree)> {
        self.trees.iter().enumerate().map(|(i, t)| (TreeId(i), t))
    }

    /// Mutable trees
    pub fn trees_mut(&mut self) -> impl Iterator<Item = &mut LandingTree> {
        self.trees.iter_mut()
    }

    /// Every record, tree by tree
    pub fn nodes(&self) -> impl Iterator<Item = &PersistedTreeNode> {
        self.trees.iter().flat_map(|t| t.nodes.iter())
    }

    /// Every record with no parent, tree by tree
    pub fn roots(&self) -> impl Iterator<Item = &PersistedTreeNode> {
        self.trees.iter().flat_map(LandingTree::roots)
    }

    /// Append a tree
    pub fn push_tree(&mut self, tree: LandingTree) -> TreeId {
        self.trees.push(tree);
        TreeId(self.trees.len() - 1)
    }

    /// Number of trees
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Check if forest has no trees
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Build the lookup index
    #[must_use]
    pub fn index(&self) -> ForestIndex<'_> {
        ForestIndex::build(self)
    }
}

impl From<Vec<Vec<PersistedTreeNode>>> for Forest {
    fn from(trees: Vec<Vec<PersistedTreeNode>>) -> Self {
        Self::new(trees.into_iter().map(LandingTree::new).collect())
    }
}

/// Location of one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Owning tree
    pub tree: TreeId,
    /// Position in the tree
    pub position: usize,
}

/// Id and parent lookups over a borrowed forest
#[derive(Debug)]
pub struct ForestIndex<'a> {
    forest: &'a Forest,
    /// id -> every occurrence, first-seen order
    by_id: IndexMap<&'a str, Vec<NodeRef>>,
    /// parent id -> children, forest order
    children: HashMap<&'a str, Vec<NodeRef>>,
}

impl<'a> ForestIndex<'a> {
    /// Index every record of `forest`
    #[must_use]
    pub fn build(forest: &'a Forest) -> Self {
        let mut by_id: IndexMap<&str, Vec<NodeRef>> = IndexMap::new();
        let mut children: HashMap<&str, Vec<NodeRef>> = HashMap::new();

        for (tree, nodes) in forest.iter() {
            for (position, node) in nodes.nodes().iter().enumerate() {
                let at = NodeRef { tree, position };
                by_id.entry(node.id.as_str()).or_default().push(at);
                children.entry(node.parent.as_str()).or_default().push(at);
            }
        }

        Self {
            forest,
            by_id,
            children,
        }
    }

    /// Record at `at`
    #[must_use]
    pub fn node(&self, at: NodeRef) -> Option<&'a PersistedTreeNode> {
        self.forest
            .tree(at.tree)
            .and_then(|t| t.nodes().get(at.position))
    }

    /// First occurrence of `id`
    #[must_use]
    pub fn locate(&self, id: &str) -> Option<NodeRef> {
        self.by_id.get(id).and_then(|refs| refs.first().copied())
    }

    /// First record with `id`
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a PersistedTreeNode> {
        self.locate(id).and_then(|at| self.node(at))
    }

    /// Check if `id` is anywhere in the forest
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Check if `id` is in `tree`
    #[must_use]
    pub fn tree_contains(&self, tree: TreeId, id: &str) -> bool {
        self.by_id
            .get(id)
            .is_some_and(|refs| refs.iter().any(|r| r.tree == tree))
    }

    /// Ids appearing more than once, first-seen order
    #[must_use]
    pub fn duplicated_ids(&self) -> Vec<&'a str> {
        self.by_id
            .iter()
            .filter(|(_, refs)| refs.len() > 1)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Records pointing at `parent`, forest order
    pub fn children_of(&self, parent: &str) -> impl Iterator<Item = &'a PersistedTreeNode> + '_ {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .filter_map(|at| self.node(*at))
    }

    /// Materialize the subtree under `root` over the whole forest
    ///
    /// Children are stable-sorted by `order` (1000 when unset) and their view
    /// `order` is set to their position. The walk keeps its own stack, so the
    /// depth below `root` is bounded by [`MAX_TREE_DEPTH`] and not by the
    /// thread stack.
    ///
    /// # Errors
    /// - `ForestError::Cycle` if a parent chain revisits an ancestor
    /// - `ForestError::TooDeep` if a node sits deeper than [`MAX_TREE_DEPTH`]
    pub fn materialize(&self, root: &PersistedTreeNode) -> ForestResult<LandingNode> {
        let mut path: HashSet<&str> = HashSet::new();
        path.insert(root.id.as_str());

        let mut root_frame = self.frame(root);
        let mut stack: Vec<Frame<'_>> = Vec::new();

        loop {
            let top = stack.last_mut().unwrap_or(&mut root_frame);

            if let Some(record) = top.pending.pop() {
                if !path.insert(record.id.as_str()) {
                    return Err(ForestError::Cycle {
                        id: record.id.clone(),
                    });
                }
                if stack.len() >= MAX_TREE_DEPTH {
                    return Err(ForestError::TooDeep {
                        id: record.id.clone(),
                        max: MAX_TREE_DEPTH,
                    });
                }
                stack.push(self.frame(record));
                continue;
            }

            let Some(done) = stack.pop() else {
                return Ok(root_frame.finish());
            };
            path.remove(done.record.id.as_str());
            stack
                .last_mut()
                .unwrap_or(&mut root_frame)
                .adopt(done.finish());
        }
    }

    // Children still to visit are kept in reverse so `pop` yields them in
    // sibling order
    fn frame<'p>(&self, record: &'p PersistedTreeNode) -> Frame<'p>
    where
        'a: 'p,
    {
        let mut pending: Vec<&'p PersistedTreeNode> = self.children_of(&record.id).collect();
        pending.sort_by_key(|n| n.sort_key());
        pending.reverse();

        Frame {
            record,
            built: Vec::with_capacity(pending.len()),
            pending,
        }
    }
}

/// Node being materialized
struct Frame<'p> {
    record: &'p PersistedTreeNode,
    pending: Vec<&'p PersistedTreeNode>,
    built: Vec<LandingNode>,
}

impl Frame<'_> {
    fn adopt(&mut self, mut child: LandingNode) {
        child.record.order = i64::try_from(self.built.len()).ok();
        self.built.push(child);
    }

    fn finish(self) -> LandingNode {
        LandingNode {
            record: self.record.clone(),
            children: self.built,
        }
    }
}
