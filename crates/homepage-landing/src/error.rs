//! Error types for landing forest operations

use crate::forest::TreeId;
use homepage_storage::StorageError;
use thiserror::Error;

/// Forest integrity violations
///
/// Raised before anything is persisted; callers must not save a forest that
/// failed one of these checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    /// An id appears more than once across the forest
    #[error("Duplicated nodes found with ids: {}", .ids.join(", "))]
    DuplicatedNodes {
        /// Offending ids, first-seen order
        ids: Vec<String>,
    },

    /// Nodes whose parent is not in their own tree
    #[error("The parent node of children: {}; is not in the tree.", .ids.join(", "))]
    ParentsOutOfPlace {
        /// Offending node ids
        ids: Vec<String>,
    },

    /// Tree without a root node
    #[error("No value for root in {tree}")]
    MissingRoot {
        /// Tree lacking the root
        tree: TreeId,
    },

    /// Single-node insertion got zero or several nodes
    #[error("Unexpected error: 'there is no item to create' or 'creating more than one item' (got {count})")]
    InvalidCreation {
        /// Number of nodes received
        count: usize,
    },

    /// Parent pointers loop back onto an ancestor
    #[error("Cycle in parent pointers at node {id}")]
    Cycle {
        /// First node revisited
        id: String,
    },

    /// Parent chain deeper than the materialization limit
    #[error("Landing node {id} is nested deeper than {max} levels")]
    TooDeep {
        /// First node past the limit
        id: String,
        /// Deepest level allowed
        max: usize,
    },
}

/// Landing repository errors
#[derive(Debug, Error)]
pub enum LandingError {
    /// Data store failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Integrity violation
    #[error(transparent)]
    Forest(#[from] ForestError),

    /// A persisted tree does not decode
    #[error("Invalid landing tree at {tree}: {source}")]
    Decode {
        /// Tree position in the stored document
        tree: TreeId,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// The stored document is not a list of trees
    #[error("Landing pages document is not a list of trees: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Requested node or action does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Imported page actions point at a missing page or one already listing them
    #[error("Unable to import actions. Some action is referencing an invalid page: {}", .ids.join(", "))]
    InvalidActionReference {
        /// Offending action ids
        ids: Vec<String>,
    },
}

impl LandingError {
    /// Check if the error is an integrity violation
    #[inline]
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Forest(_))
    }
}

/// Forest operation result
pub type ForestResult<T> = Result<T, ForestError>;

/// Landing repository result
pub type LandingResult<T> = Result<T, LandingError>;
