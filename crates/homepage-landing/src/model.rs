//! Landing node records and views
//!
//! [`PersistedTreeNode`] is the flat parent-pointer record stored in the data
//! store; [`LandingNode`] is the materialized view with nested children.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `parent` value of a tree root
pub const ROOT_PARENT: &str = "none";

/// Sort key of a node without an explicit order
pub const DEFAULT_ORDER: i64 = 1000;

/// Length of a generated node id
pub const UID_LENGTH: usize = 11;

const UID_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const UID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// Landing page
    Root,
    /// Top-level block of a page
    Section,
    /// Block nested in a section
    SubSection,
    /// Grouping of actions
    Category,
}

/// How a page lays out its sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRendering {
    /// One section at a time
    Single,
    /// All sections on one page
    Multiple,
}

/// Text with a reference value and per-locale translations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatableText {
    /// Translation key
    pub key: String,
    /// Untranslated text
    pub reference_value: String,
    /// Locale to text
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
}

impl TranslatableText {
    /// Text without translations
    #[must_use]
    pub fn new(key: impl Into<String>, reference_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reference_value: reference_value.into(),
            translations: BTreeMap::new(),
        }
    }
}

fn default_execute_on_init() -> bool {
    true
}

/// Flat landing node record
///
/// Missing display attributes decode to `""`, missing `actions` to `[]` and
/// missing `executeOnInit` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTreeNode {
    /// Unique id across the whole forest
    pub id: String,
    /// Parent id, [`ROOT_PARENT`] for roots
    pub parent: String,
    /// Node kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Position among siblings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Display name
    pub name: TranslatableText,
    /// Heading shown above the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<TranslatableText>,
    /// Free text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<TranslatableText>,
    /// Ids of the launchable actions shown by the node
    #[serde(default)]
    pub actions: Vec<String>,
    /// Icon URL or data URI
    #[serde(default)]
    pub icon: String,
    /// `top` or `bottom` of the node card
    #[serde(default)]
    pub icon_location: String,
    /// Icon size hint for the node card
    #[serde(default)]
    pub icon_size: String,
    /// Browser tab icon; a page's value is copied to its descendants
    #[serde(default)]
    pub favicon: String,
    /// CSS color of the node
    #[serde(default)]
    pub background_color: String,
    /// Section layout, meaningful on roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_rendering: Option<PageRendering>,
    /// Left out when looking for a page's single primary action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<bool>,
    /// Landing page may be opened at start
    #[serde(default = "default_execute_on_init")]
    pub execute_on_init: bool,
}

impl PersistedTreeNode {
    /// Bare node of `node_type` under `parent`
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        parent: impl Into<String>,
        node_type: NodeType,
        name: TranslatableText,
    ) -> Self {
        Self {
            id: id.into(),
            parent: parent.into(),
            node_type,
            order: None,
            name,
            title: None,
            content: None,
            actions: Vec::new(),
            icon: String::new(),
            icon_location: String::new(),
            icon_size: String::new(),
            favicon: String::new(),
            background_color: String::new(),
            page_rendering: None,
            secondary: None,
            execute_on_init: true,
        }
    }

    /// Landing page seeded into an empty store
    #[must_use]
    pub fn default_root() -> Self {
        Self {
            icon: "img/logo-eyeseetea.png".into(),
            icon_location: "top".into(),
            page_rendering: Some(PageRendering::Multiple),
            title: Some(TranslatableText::new("root-title", "Welcome to Home Page App")),
            background_color: "#276696".into(),
            secondary: Some(false),
            ..Self::new(
                generate_uid(),
                ROOT_PARENT,
                NodeType::Root,
                TranslatableText::new("root-name", "Main landing page"),
            )
        }
    }

    /// Check if the node points at no parent
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent == ROOT_PARENT
    }

    /// Sort key among siblings
    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }
}

/// Materialized landing node
///
/// `record.order` of a child is its position among its siblings; it is a
/// view attribute and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingNode {
    /// Node attributes
    #[serde(flatten)]
    pub record: PersistedTreeNode,
    /// Children sorted by order
    #[serde(default)]
    pub children: Vec<LandingNode>,
}

impl LandingNode {
    /// Leaf view of `record`
    #[must_use]
    pub fn leaf(record: PersistedTreeNode) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    /// Node id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Parent id
    #[inline]
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.record.parent
    }

    /// Depth-first search of this subtree
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&LandingNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id() == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

// Flattens the subtree first so dropping a deep view does not recurse
impl Drop for LandingNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Depth-first search across several trees
#[must_use]
pub fn find_node<'a>(landings: &'a [LandingNode], id: &str) -> Option<&'a LandingNode> {
    landings.iter().find_map(|landing| landing.find(id))
}

/// Generate an 11 character id: a letter followed by letters or digits
#[must_use]
pub fn generate_uid() -> String {
    let mut rng = rand::rng();
    let mut uid = String::with_capacity(UID_LENGTH);

    uid.push(char::from(UID_LETTERS[rng.random_range(0..UID_LETTERS.len())]));
    for _ in 1..UID_LENGTH {
        uid.push(char::from(UID_CHARS[rng.random_range(0..UID_CHARS.len())]));
    }

    uid
}

/// Check if `id` has the generated id shape
#[must_use]
pub fn is_valid_uid(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == UID_LENGTH
        && bytes[0].is_ascii_alphabetic()
        && bytes.iter().all(u8::is_ascii_alphanumeric)
}
