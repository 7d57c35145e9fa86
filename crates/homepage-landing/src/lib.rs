//! Home Page Landing
//!
//! Persistence of landing pages: a forest of trees (one per landing page) of
//! sections, sub-sections and categories, stored as flat parent-pointer
//! records under `"landing-pages"`.
//!
//! # Core Operations
//!
//! - **Read**: [`LandingNodeRepository::get_all`] materializes every tree,
//!   seeding a default page into an empty store
//! - **Merge**: [`update_landing_node`] updates, appends or inserts records
//! - **Validate**: [`validate_no_duplicated_node`] and
//!   [`validate_parents_in_same_landing_tree`] guard every structural write
//! - **Prune**: [`LandingNodeRepository::delete_nodes`] removes nodes with
//!   their whole subtree
//! - **Share**: [`ConfigRepository`] keeps per-page sharing and
//!   [`ListUserLandingPagesUseCase`] applies it for one user
//! - **Notify**: [`NotificationRepository`] lists and marks user
//!   notifications
//! - **Actions**: [`ImportActionsUseCase`] checks that page actions point at
//!   a landing page before saving them
//!
//! # Example
//!
//! ```rust
//! use homepage_landing::{LandingNodeDefaultRepository, LandingNodeRepository};
//! use homepage_storage::InMemoryStorage;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), homepage_landing::LandingError> {
//! let repository = LandingNodeDefaultRepository::new(Arc::new(InMemoryStorage::new()));
//!
//! let landings = repository.get_all().await?;
//! assert_eq!(landings.len(), 1);
//! assert_eq!(landings[0].record.name.reference_value, "Main landing page");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod access;
pub mod actions;
pub mod error;
pub mod forest;
pub mod migrations;
pub mod model;
pub mod notification;
pub mod reconcile;
pub mod repository;
pub mod settings;
pub mod usecases;

// Re-exports
pub use access::{
    flatten_landing_nodes, update_landings, LandingPagePermission, NamedRef, User,
    NO_PUBLIC_ACCESS, READ_PUBLIC_ACCESS,
};
pub use actions::{
    ActionDefaultRepository, ActionRepository, ImportActionsUseCase, PersistedAction, ACTIONS_KEY,
    PAGE_ACTION_TYPE,
};
pub use error::{ForestError, ForestResult, LandingError, LandingResult};
pub use forest::{Forest, ForestIndex, LandingTree, NodeRef, TreeId, MAX_TREE_DEPTH};
pub use migrations::landing_migrations;
pub use model::{
    find_node, generate_uid, is_valid_uid, LandingNode, NodeType, PageRendering,
    PersistedTreeNode, TranslatableText, DEFAULT_ORDER, ROOT_PARENT,
};
pub use notification::{
    merge_notifications, ListCurrentUserNotificationsUseCase, Notification,
    NotificationDefaultRepository, NotificationListOptions, NotificationRecipients,
    NotificationRepository, NotificationWildcard, ReadCurrentUserNotificationsUseCase,
    ReadReceipt, NOTIFICATIONS_KEY,
};
pub use reconcile::{
    extract_children_nodes, prune_nodes, remove_misplaced_nodes, update_landing_node,
    update_landing_pages, validate_no_duplicated_node, validate_parents_in_same_landing_tree,
};
pub use repository::{LandingNodeDefaultRepository, LandingNodeRepository, LANDING_PAGES_KEY};
pub use settings::{
    ConfigDefaultRepository, ConfigRepository, Permission, PermissionUpdate, PersistedConfig,
    APP_CONFIG_KEY,
};
pub use usecases::{ImportLandingNodesUseCase, ListUserLandingPagesUseCase, UpdateLandingNodeUseCase};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for landing page persistence
    pub use crate::{
        Forest, LandingError, LandingNode, LandingNodeDefaultRepository, LandingNodeRepository,
        LandingTree, NodeType, PersistedTreeNode, TranslatableText, TreeId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
