//! Testing utilities for the Home Page workspace
//!
//! Landing forest fixtures and a storage that records every call.

#![allow(missing_docs)]

use async_trait::async_trait;
use homepage_landing::{Forest, LandingNode, LandingTree, PersistedTreeNode};
use homepage_storage::{DebugSink, InMemoryStorage, Storage, StorageError, StorageResult};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;

pub const ROOT_ID: &str = "pAfyLmQmCU6";
pub const SECTION_ID: &str = "XusobLebMel";
pub const SUB_SECTION_ID: &str = "ycAtL2slUDJ";
pub const SECOND_ROOT_ID: &str = "SEuEePxkvE7";
pub const SECOND_SECTION_ID: &str = "MmG1BCLXE1Q";

fn text(id: &str, field: &str, value: &str) -> Value {
    json!({ "key": format!("{id}-{field}"), "referenceValue": value, "translations": {} })
}

fn record(id: &str, parent: &str, node_type: &str, order: Option<i64>, name: &str, actions: &[&str]) -> Value {
    let mut node = json!({
        "id": id,
        "parent": parent,
        "type": node_type,
        "name": text(id, "name", name),
        "title": text(id, "title", name),
        "actions": actions,
        "icon": "",
        "iconLocation": "",
        "iconSize": "",
        "favicon": "",
        "backgroundColor": "",
        "pageRendering": "multiple",
        "secondary": false,
        "executeOnInit": true
    });
    if let Some(order) = order {
        node["order"] = json!(order);
    }
    node
}

/// Two consistent landing pages
pub fn valid_landing_pages_tree() -> Forest {
    let mut general_root = record(ROOT_ID, "none", "root", None, "General Landing Page", &[
        "google-action",
        "dhis-2-academy",
        "github",
    ]);
    general_root["icon"] = json!("img/logo-eyeseetea.png");
    general_root["favicon"] = json!("img/logo-eyeseetea.png");
    general_root["backgroundColor"] = json!("#276696");

    let mut dhis_root = record(SECOND_ROOT_ID, "none", "root", Some(1), "DHIS2 Landing", &[]);
    dhis_root["backgroundColor"] = json!("#0008FF");

    serde_json::from_value(json!([
        [
            general_root,
            record(SECTION_ID, ROOT_ID, "section", Some(0), "My first section", &[]),
            record(SUB_SECTION_ID, SECTION_ID, "sub-section", Some(0), "This is a subsection", &[]),
        ],
        [
            dhis_root,
            record(SECOND_SECTION_ID, SECOND_ROOT_ID, "section", Some(0), "DHIS2 General", &[
                "dhis-2",
                "dhis-2-community",
            ]),
            record("Jqdtr2lTgNP", SECOND_ROOT_ID, "section", Some(1), "DHIS2 Dev Specific", &[
                "dhis-2-ui",
                "dhis-2-documentation",
            ]),
            record("jFYOc9eUhVd", "Jqdtr2lTgNP", "sub-section", Some(0), "API Documentation", &[
                "dhis-2-api",
            ]),
        ],
    ]))
    .unwrap()
}

fn second_tree_section(forest: &Forest) -> PersistedTreeNode {
    forest.trees()[1].nodes()[1].clone()
}

/// Second page's section repeated at the end of its own tree
pub fn duplicated_nodes() -> Forest {
    let valid = valid_landing_pages_tree();
    let section = second_tree_section(&valid);

    let mut trees = valid.into_trees();
    trees[1].push(section);
    Forest::new(trees)
}

/// Second page's section copied into the first page's tree
pub fn children_out_of_place() -> Forest {
    let valid = valid_landing_pages_tree();
    let section = second_tree_section(&valid);

    let mut trees = valid.into_trees();
    trees[0].push(section);
    Forest::new(trees)
}

/// First page's section, materialized with its sub-section
pub fn section_node() -> LandingNode {
    let forest = valid_landing_pages_tree();
    let tree: &LandingTree = &forest.trees()[0];

    LandingNode {
        record: tree.nodes()[1].clone(),
        children: vec![LandingNode::leaf(tree.nodes()[2].clone())],
    }
}

/// Storage call as seen by [`RecordingStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    Get(String),
    Save(String),
    Delete(String),
    Keys,
    Permission,
}

/// In-memory storage that records calls and can fail writes on demand
#[derive(Debug, Default)]
pub struct RecordingStorage {
    inner: InMemoryStorage,
    events: Mutex<Vec<StorageEvent>>,
    failing_saves: Mutex<HashSet<String>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::wrap(InMemoryStorage::new())
    }

    pub fn wrap(inner: InMemoryStorage) -> Self {
        Self {
            inner,
            events: Mutex::new(Vec::new()),
            failing_saves: Mutex::new(HashSet::new()),
        }
    }

    /// Storage already holding `forest` under `"landing-pages"`
    pub fn with_forest(forest: &Forest) -> Self {
        Self::wrap(InMemoryStorage::new().with_entry(
            homepage_landing::LANDING_PAGES_KEY,
            serde_json::to_value(forest).unwrap(),
        ))
    }

    /// Make every save to `key` fail
    pub fn fail_saves_to(&self, key: &str) {
        self.failing_saves.lock().insert(key.to_string());
    }

    pub fn events(&self) -> Vec<StorageEvent> {
        self.events.lock().clone()
    }

    pub fn saves(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                StorageEvent::Save(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn inner(&self) -> &InMemoryStorage {
        &self.inner
    }

    fn record(&self, event: StorageEvent) {
        self.events.lock().push(event);
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get_value(&self, key: &str) -> StorageResult<Option<Value>> {
        self.record(StorageEvent::Get(key.to_string()));
        self.inner.get_value(key).await
    }

    async fn save_value(&self, key: &str, value: Value) -> StorageResult<()> {
        self.record(StorageEvent::Save(key.to_string()));
        if self.failing_saves.lock().contains(key) {
            return Err(StorageError::Backend(format!("save to {key} rejected")));
        }
        self.inner.save_value(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.record(StorageEvent::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        self.record(StorageEvent::Keys);
        self.inner.get_keys().await
    }

    async fn has_permission(&self, debug: &DebugSink) -> StorageResult<()> {
        self.record(StorageEvent::Permission);
        self.inner.has_permission(debug).await
    }
}
