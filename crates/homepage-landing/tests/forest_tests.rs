//! Landing Forest Tests
//!
//! Repository, use case and validation behavior over the shared fixtures.

use homepage_landing::prelude::*;
use homepage_landing::{
    prune_nodes, validate_no_duplicated_node, validate_parents_in_same_landing_tree, ForestError,
    ImportLandingNodesUseCase, UpdateLandingNodeUseCase, LANDING_PAGES_KEY, ROOT_PARENT,
};
use homepage_test_utils::{
    children_out_of_place, duplicated_nodes, section_node, valid_landing_pages_tree,
    RecordingStorage, StorageEvent, ROOT_ID, SECOND_ROOT_ID, SECOND_SECTION_ID, SECTION_ID,
    SUB_SECTION_ID,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn stored_forest(storage: &RecordingStorage) -> Forest {
    serde_json::from_value(storage.inner().raw(LANDING_PAGES_KEY).unwrap()).unwrap()
}

fn tree_ids(forest: &Forest) -> Vec<Vec<String>> {
    forest
        .trees()
        .iter()
        .map(|t| t.nodes().iter().map(|n| n.id.clone()).collect())
        .collect()
}

#[test]
fn valid_fixture_passes_both_validators_unchanged() {
    let forest = valid_landing_pages_tree();

    assert!(std::ptr::eq(validate_no_duplicated_node(&forest).unwrap(), &forest));
    assert!(std::ptr::eq(validate_parents_in_same_landing_tree(&forest).unwrap(), &forest));
}

#[test]
fn duplicated_fixture_names_the_section() {
    let err = validate_no_duplicated_node(&duplicated_nodes()).unwrap_err();
    assert_eq!(
        err,
        ForestError::DuplicatedNodes {
            ids: vec![SECOND_SECTION_ID.to_string()]
        }
    );
}

#[test]
fn out_of_place_fixture_names_the_section() {
    let err = validate_parents_in_same_landing_tree(&children_out_of_place()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("The parent node of children: {SECOND_SECTION_ID}; is not in the tree.")
    );
}

#[tokio::test]
async fn empty_store_seeds_one_tree_then_reuses_it() {
    let storage = Arc::new(RecordingStorage::new());
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    let first = repository.get_all().await.unwrap();
    let second = repository.get_all().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].record.parent, ROOT_PARENT);
    assert_eq!(first[0].record.node_type, NodeType::Root);
    assert_eq!(second, first);
    assert_eq!(storage.saves(), vec![LANDING_PAGES_KEY.to_string()]);
}

#[tokio::test]
async fn get_all_materializes_fixture() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    let landings = repository.get_all().await.unwrap();

    assert_eq!(
        landings.iter().map(LandingNode::id).collect::<Vec<_>>(),
        vec![ROOT_ID, SECOND_ROOT_ID]
    );
    assert_eq!(landings[0].children[0].id(), SECTION_ID);
    assert_eq!(landings[0].children[0].children[0].id(), SUB_SECTION_ID);
    assert_eq!(landings[1].children.len(), 2);
    assert!(storage.saves().is_empty());
}

#[tokio::test]
async fn very_deep_tree_is_skipped_and_still_prunable() {
    let mut deep = vec![PersistedTreeNode::new(
        "deep0",
        ROOT_PARENT,
        NodeType::Root,
        TranslatableText::new("deep0", "Deep"),
    )];
    for i in 1..200_000 {
        deep.push(PersistedTreeNode::new(
            format!("deep{i}"),
            format!("deep{}", i - 1),
            NodeType::Section,
            TranslatableText::new("deep", "Deep"),
        ));
    }
    let mut trees = valid_landing_pages_tree().into_trees();
    trees.push(LandingTree::new(deep));
    let storage = Arc::new(RecordingStorage::with_forest(&Forest::new(trees)));
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    let landings = repository.get_all().await.unwrap();
    assert_eq!(
        landings.iter().map(LandingNode::id).collect::<Vec<_>>(),
        vec![ROOT_ID, SECOND_ROOT_ID]
    );

    repository.delete_nodes(&["deep0".to_string()]).await.unwrap();
    assert_eq!(tree_ids(&stored_forest(&storage)), tree_ids(&valid_landing_pages_tree()));
}

#[tokio::test]
async fn update_use_case_saves_edited_section() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = Arc::new(LandingNodeDefaultRepository::new(storage.clone()));

    let mut section = section_node();
    section.record.name = TranslatableText::new("XusobLebMel-name", "Renamed");
    section.children[0].record.actions = vec!["github".into()];

    UpdateLandingNodeUseCase::new(repository).execute(&section).await.unwrap();

    let forest = stored_forest(&storage);
    assert_eq!(tree_ids(&forest), tree_ids(&valid_landing_pages_tree()));
    assert_eq!(forest.trees()[0].nodes()[1].name.reference_value, "Renamed");
    assert_eq!(forest.trees()[0].nodes()[2].actions, vec!["github".to_string()]);
}

#[tokio::test]
async fn update_use_case_inserts_single_category() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = Arc::new(LandingNodeDefaultRepository::new(storage.clone()));

    let category = PersistedTreeNode::new(
        "newCategory",
        SUB_SECTION_ID,
        NodeType::Category,
        TranslatableText::new("newCategory-name", "Category"),
    );
    UpdateLandingNodeUseCase::new(repository)
        .execute(&LandingNode::leaf(category))
        .await
        .unwrap();

    let forest = stored_forest(&storage);
    assert_eq!(forest.trees()[0].len(), 4);
    assert_eq!(forest.trees()[1].len(), 4);
}

#[tokio::test]
async fn update_use_case_refuses_corrupted_forest() {
    let storage = Arc::new(RecordingStorage::with_forest(&duplicated_nodes()));
    let repository = Arc::new(LandingNodeDefaultRepository::new(storage.clone()));

    let err = UpdateLandingNodeUseCase::new(repository)
        .execute(&section_node())
        .await
        .unwrap_err();

    assert!(err.is_integrity());
    assert!(storage.saves().is_empty());
}

#[tokio::test]
async fn import_appends_unknown_records_as_tree() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = Arc::new(LandingNodeDefaultRepository::new(storage.clone()));

    let items = vec![
        PersistedTreeNode::new("importRoot1", ROOT_PARENT, NodeType::Root, TranslatableText::new("i", "Imported")),
        PersistedTreeNode::new("importSect1", "importRoot1", NodeType::Section, TranslatableText::new("s", "Section")),
    ];
    let imported = ImportLandingNodesUseCase::new(repository.clone())
        .execute(items.clone())
        .await
        .unwrap();

    assert_eq!(imported, items);
    let landings = repository.get_all().await.unwrap();
    assert_eq!(landings.len(), 3);
    assert_eq!(landings[2].children[0].id(), "importSect1");
}

#[tokio::test]
async fn delete_section_prunes_its_subtree() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    repository.delete_nodes(&[SECTION_ID.to_string()]).await.unwrap();

    let forest = stored_forest(&storage);
    assert_eq!(forest.trees()[0].nodes().len(), 1);
    assert_eq!(forest.trees()[1].nodes().len(), 4);
}

#[tokio::test]
async fn delete_root_removes_tree() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    repository.delete_nodes(&[ROOT_ID.to_string()]).await.unwrap();

    let forest = stored_forest(&storage);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest.trees()[0].nodes()[0].id, SECOND_ROOT_ID);
}

#[tokio::test]
async fn failed_save_surfaces_storage_error() {
    let storage = Arc::new(RecordingStorage::with_forest(&valid_landing_pages_tree()));
    storage.fail_saves_to(LANDING_PAGES_KEY);
    let repository = LandingNodeDefaultRepository::new(storage.clone());

    let err = repository.delete_nodes(&[SECTION_ID.to_string()]).await.unwrap_err();

    assert!(matches!(err, LandingError::Storage(_)));
    assert_eq!(
        storage.events(),
        vec![
            StorageEvent::Get(LANDING_PAGES_KEY.to_string()),
            StorageEvent::Save(LANDING_PAGES_KEY.to_string()),
        ]
    );
    assert_eq!(stored_forest(&storage), valid_landing_pages_tree());
}

fn node(id: String, parent: String) -> PersistedTreeNode {
    let node_type = if parent == ROOT_PARENT {
        NodeType::Root
    } else {
        NodeType::Section
    };
    let name = TranslatableText::new(id.clone(), id.clone());
    PersistedTreeNode::new(id, parent, node_type, name)
}

/// Consistent forests: each node's parent is an earlier node of its tree
fn forest_strategy() -> impl Strategy<Value = Forest> {
    proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..8), 1..4)
        .prop_map(|trees| {
            let trees = trees
                .into_iter()
                .enumerate()
                .map(|(t, parents)| {
                    let mut nodes = vec![node(format!("t{t}n0"), ROOT_PARENT.to_string())];
                    for (n, parent) in parents.into_iter().enumerate() {
                        let parent_id = nodes[parent.index(nodes.len())].id.clone();
                        nodes.push(node(format!("t{t}n{}", n + 1), parent_id));
                    }
                    LandingTree::new(nodes)
                })
                .collect();
            Forest::new(trees)
        })
}

proptest! {
    #[test]
    fn prop_pruning_keeps_forest_consistent(
        forest in forest_strategy(),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..4),
    ) {
        let all: Vec<&PersistedTreeNode> = forest.nodes().collect();
        let deleted: Vec<String> = picks.iter().map(|i| all[i.index(all.len())].id.clone()).collect();
        let deleted_set: HashSet<&str> = deleted.iter().map(String::as_str).collect();

        let parents: HashMap<&str, &str> = all.iter().map(|n| (n.id.as_str(), n.parent.as_str())).collect();
        let survives = |id: &str| {
            let mut current = id;
            loop {
                if deleted_set.contains(current) {
                    return false;
                }
                match parents.get(current) {
                    Some(&parent) if parent != ROOT_PARENT => current = parent,
                    _ => return true,
                }
            }
        };

        let pruned = prune_nodes(&forest, &deleted).unwrap();

        prop_assert!(validate_no_duplicated_node(&pruned).is_ok());
        prop_assert!(validate_parents_in_same_landing_tree(&pruned).is_ok());

        let kept: HashSet<&str> = pruned.nodes().map(|n| n.id.as_str()).collect();
        for node in &all {
            prop_assert_eq!(kept.contains(node.id.as_str()), survives(&node.id));
        }
    }
}
