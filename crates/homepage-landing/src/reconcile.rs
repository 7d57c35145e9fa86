//! Forest merge, validation and pruning
//!
//! Pure functions over [`Forest`]; persistence lives in the repository.

use crate::error::{ForestError, ForestResult};
use crate::forest::{Forest, LandingTree};
use crate::model::{LandingNode, NodeType, PersistedTreeNode, ROOT_PARENT};
use std::collections::{HashMap, HashSet, VecDeque};

/// Flatten a view into records, pre-order, stamping each record's parent
///
/// The top node gets `parent`; every descendant gets the id of the node it
/// is nested in.
#[must_use]
pub fn extract_children_nodes(node: &LandingNode, parent: &str) -> Vec<PersistedTreeNode> {
    let mut out = Vec::new();
    let mut stack: Vec<(&LandingNode, &str)> = vec![(node, parent)];

    while let Some((current, parent)) = stack.pop() {
        out.push(PersistedTreeNode {
            parent: parent.to_string(),
            ..current.record.clone()
        });
        stack.extend(current.children.iter().rev().map(|child| (child, current.id())));
    }

    out
}

/// Merge `items` into `forest`
///
/// - update: some item id is already stored, so every stored record whose
///   id matches an item is replaced in every tree; items not yet stored are
///   dropped
/// - append: nothing matches and `import_new_node` is set, so `items`
///   become a new tree at the end
/// - insert: nothing matches, so the single item is appended to every tree
///   holding its parent
///
/// # Errors
/// `ForestError::InvalidCreation` if the insert branch gets zero or several
/// items
pub fn update_landing_node(
    mut forest: Forest,
    items: Vec<PersistedTreeNode>,
    import_new_node: bool,
) -> ForestResult<Forest> {
    let index = forest.index();
    let is_update = items.iter().any(|item| index.contains(&item.id));
    drop(index);

    if is_update {
        // First occurrence of a repeated id wins
        let mut by_id: HashMap<&str, &PersistedTreeNode> = HashMap::with_capacity(items.len());
        for item in &items {
            by_id.entry(item.id.as_str()).or_insert(item);
        }

        for tree in forest.trees_mut() {
            for node in tree.nodes_mut() {
                if let Some(item) = by_id.get(node.id.as_str()) {
                    *node = (*item).clone();
                }
            }
        }
        return Ok(forest);
    }

    if import_new_node {
        forest.push_tree(LandingTree::new(items));
        return Ok(forest);
    }

    let count = items.len();
    let Ok([item]) = <[PersistedTreeNode; 1]>::try_from(items) else {
        return Err(ForestError::InvalidCreation { count });
    };

    for tree in forest.trees_mut() {
        if tree.contains(&item.parent) {
            tree.push(item.clone());
        }
    }
    Ok(forest)
}

/// Merge without ever creating a tree: update or single insert
///
/// # Errors
/// See [`update_landing_node`]
pub fn update_landing_pages(forest: Forest, items: Vec<PersistedTreeNode>) -> ForestResult<Forest> {
    update_landing_node(forest, items, false)
}

/// Return `forest` itself unless an id repeats
///
/// # Errors
/// `ForestError::DuplicatedNodes` naming the repeated ids
pub fn validate_no_duplicated_node(forest: &Forest) -> ForestResult<&Forest> {
    let duplicated = forest.index().duplicated_ids();

    if duplicated.is_empty() {
        Ok(forest)
    } else {
        Err(ForestError::DuplicatedNodes {
            ids: duplicated.into_iter().map(str::to_string).collect(),
        })
    }
}

/// Return `forest` itself unless a node's parent lives outside its tree
///
/// Only records with `parent == "none"` and `type == root` are exempt.
///
/// # Errors
/// `ForestError::ParentsOutOfPlace` naming every offending node
pub fn validate_parents_in_same_landing_tree(forest: &Forest) -> ForestResult<&Forest> {
    let index = forest.index();

    let out_of_place: Vec<String> = forest
        .iter()
        .flat_map(|(tree, nodes)| {
            let index = &index;
            nodes
                .nodes()
                .iter()
                .filter(|n| !(n.is_root() && n.node_type == NodeType::Root))
                .filter(move |n| !index.tree_contains(tree, &n.parent))
                .map(|n| n.id.clone())
        })
        .collect();

    if out_of_place.is_empty() {
        Ok(forest)
    } else {
        Err(ForestError::ParentsOutOfPlace { ids: out_of_place })
    }
}

/// Forest without the nodes in `ids` and everything below them
///
/// A node survives only when it is reachable from its tree's root through
/// surviving nodes of the same tree. Trees whose root is deleted disappear.
/// Surviving roots get `parent = "none"`; stored order is kept.
///
/// # Errors
/// `ForestError::MissingRoot` if a tree has no root-typed node
pub fn prune_nodes(forest: &Forest, ids: &[String]) -> ForestResult<Forest> {
    let deleted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut trees = Vec::with_capacity(forest.len());

    for (tree_id, tree) in forest.iter() {
        let nodes = tree.nodes();
        let root = nodes
            .iter()
            .position(|n| n.node_type == NodeType::Root)
            .ok_or(ForestError::MissingRoot { tree: tree_id })?;
        if deleted.contains(nodes[root].id.as_str()) {
            continue;
        }

        let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            children.entry(node.parent.as_str()).or_default().push(position);
        }

        // Walk positions, not ids, so repeated ids cannot loop
        let mut reachable = vec![false; nodes.len()];
        reachable[root] = true;
        let mut queue = VecDeque::from([root]);

        while let Some(at) = queue.pop_front() {
            for &child in children.get(nodes[at].id.as_str()).into_iter().flatten() {
                if !reachable[child] && !deleted.contains(nodes[child].id.as_str()) {
                    reachable[child] = true;
                    queue.push_back(child);
                }
            }
        }

        let kept = nodes
            .iter()
            .enumerate()
            .filter(|(position, _)| reachable[*position])
            .map(|(position, node)| {
                if position == root {
                    PersistedTreeNode {
                        parent: ROOT_PARENT.to_string(),
                        ..node.clone()
                    }
                } else {
                    node.clone()
                }
            })
            .collect();

        trees.push(LandingTree::new(kept));
    }

    Ok(Forest::new(trees))
}

/// Per tree, drop repeated ids and nodes whose parent is not in the tree
///
/// Roots (`parent == "none"` or `type == root`) are always kept; the first
/// record of an id wins.
#[must_use]
pub fn remove_misplaced_nodes(forest: &Forest) -> Forest {
    let trees = forest
        .trees()
        .iter()
        .map(|tree| {
            let mut kept: HashSet<&str> = HashSet::new();
            let nodes = tree
                .nodes()
                .iter()
                .filter(|node| {
                    let in_parent_tree = node.is_root()
                        || node.node_type == NodeType::Root
                        || tree.contains(&node.parent);
                    in_parent_tree && kept.insert(node.id.as_str())
                })
                .cloned()
                .collect();
            LandingTree::new(nodes)
        })
        .collect();

    Forest::new(trees)
}
