//! Per-user visibility of landing pages

use crate::model::LandingNode;
use serde::{Deserialize, Serialize};

/// Public access string granting nothing
pub const NO_PUBLIC_ACCESS: &str = "--------";

/// Public access string granting read access to everyone
pub const READ_PUBLIC_ACCESS: &str = "r-------";

/// Reference to a user or user group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Referenced id
    pub id: String,
    /// Display name, empty when unknown
    #[serde(default)]
    pub name: String,
}

impl NamedRef {
    /// Reference with an empty name
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
        }
    }
}

/// Sharing settings of one landing node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingPagePermission {
    /// Node the settings apply to
    pub id: String,
    /// Users granted access
    #[serde(default)]
    pub users: Vec<NamedRef>,
    /// Groups whose members are granted access
    #[serde(default)]
    pub user_groups: Vec<NamedRef>,
    /// `--------`, `r-------` or `rw------`
    #[serde(default)]
    pub public_access: String,
}

/// Principal viewing the landing pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Groups the user belongs to
    #[serde(default)]
    pub user_groups: Vec<NamedRef>,
}

impl User {
    /// Check if the user is listed in `users` or belongs to one of `groups`
    #[must_use]
    pub fn is_member(&self, users: &[NamedRef], groups: &[NamedRef]) -> bool {
        users.iter().any(|u| u.id == self.id)
            || groups
                .iter()
                .any(|g| self.user_groups.iter().any(|ug| ug.id == g.id))
    }
}

impl LandingPagePermission {
    /// Check if `user` may see the node
    #[must_use]
    pub fn allows(&self, user: &User) -> bool {
        user.is_member(&self.users, &self.user_groups) || self.public_access != NO_PUBLIC_ACCESS
    }
}

// Nodes without sharing settings are visible
fn is_visible(id: &str, permissions: &[LandingPagePermission], user: &User) -> bool {
    permissions
        .iter()
        .find(|p| p.id == id)
        .map_or(true, |p| p.allows(user))
}

fn filter_visible(nodes: Vec<LandingNode>, permissions: &[LandingPagePermission], user: &User) -> Vec<LandingNode> {
    nodes
        .into_iter()
        .filter(|node| is_visible(node.id(), permissions, user))
        .map(|mut node| {
            node.children = filter_visible(std::mem::take(&mut node.children), permissions, user);
            node
        })
        .collect()
}

fn spread_favicon(node: &mut LandingNode, favicon: &str) {
    node.record.favicon = favicon.to_string();
    for child in &mut node.children {
        spread_favicon(child, favicon);
    }
}

/// Landing pages as `user` sees them
///
/// Hidden nodes are removed with their subtrees and every page's favicon is
/// copied to all its descendants.
#[must_use]
pub fn update_landings(
    landings: Vec<LandingNode>,
    permissions: &[LandingPagePermission],
    user: &User,
) -> Vec<LandingNode> {
    let mut visible = filter_visible(landings, permissions, user);

    for landing in &mut visible {
        let favicon = landing.record.favicon.clone();
        spread_favicon(landing, &favicon);
    }

    visible
}

/// Every node of `nodes`, pre-order
#[must_use]
pub fn flatten_landing_nodes(nodes: &[LandingNode]) -> Vec<&LandingNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&LandingNode> = nodes.iter().rev().collect();

    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeType, PersistedTreeNode, TranslatableText, ROOT_PARENT};
    use pretty_assertions::assert_eq;

    fn view(id: &str, children: Vec<LandingNode>) -> LandingNode {
        LandingNode {
            record: PersistedTreeNode::new(id, ROOT_PARENT, NodeType::Section, TranslatableText::new(id, id)),
            children,
        }
    }

    fn private(id: &str) -> LandingPagePermission {
        LandingPagePermission {
            id: id.into(),
            public_access: NO_PUBLIC_ACCESS.into(),
            ..LandingPagePermission::default()
        }
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "User One".into(),
            user_groups: vec![NamedRef::id("g1")],
        }
    }

    fn ids(nodes: &[LandingNode]) -> Vec<&str> {
        flatten_landing_nodes(nodes).into_iter().map(LandingNode::id).collect()
    }

    fn tree() -> Vec<LandingNode> {
        vec![view(
            "root",
            vec![view("a", vec![view("a1", vec![])]), view("b", vec![])],
        )]
    }

    #[test]
    fn flatten_is_pre_order() {
        assert_eq!(ids(&tree()), vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn private_node_hides_subtree() {
        let visible = update_landings(tree(), &[private("a")], &user());
        assert_eq!(ids(&visible), vec!["root", "b"]);
    }

    #[test]
    fn user_or_group_grants_access() {
        let mut by_user = private("a");
        by_user.users.push(NamedRef::id("u1"));
        let mut by_group = private("b");
        by_group.user_groups.push(NamedRef::id("g1"));

        let visible = update_landings(tree(), &[by_user, by_group], &user());
        assert_eq!(ids(&visible), vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn readable_public_access_is_visible() {
        let mut public = private("a");
        public.public_access = "r-------".into();

        let visible = update_landings(tree(), &[public], &user());
        assert_eq!(ids(&visible).len(), 4);
    }

    #[test]
    fn root_favicon_reaches_descendants() {
        let mut landings = tree();
        landings[0].record.favicon = "img/favicon.png".into();

        let visible = update_landings(landings, &[], &user());
        assert!(flatten_landing_nodes(&visible)
            .iter()
            .all(|n| n.record.favicon == "img/favicon.png"));
    }
}
