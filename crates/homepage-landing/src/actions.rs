//! Launchable actions and their import
//!
//! Actions are stored as one list under [`ACTIONS_KEY`]. Only the fields the
//! landing store checks are typed; the rest of each action is kept as is.

use crate::error::{LandingError, LandingResult};
use crate::model::LandingNode;
use crate::repository::LandingNodeRepository;
use async_trait::async_trait;
use homepage_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Storage key of the action list
pub const ACTIONS_KEY: &str = "actions";

/// `type` of an action opening a landing page
pub const PAGE_ACTION_TYPE: &str = "page";

/// Stored action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAction {
    /// Unique id
    pub id: String,
    /// `app`, `page`, ...
    #[serde(rename = "type")]
    pub action_type: String,
    /// Landing page opened by a `page` action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_page_id: Option<String>,
    /// Display and launch attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistedAction {
    /// Check if the action opens a landing page
    #[inline]
    #[must_use]
    pub fn launches_page(&self) -> bool {
        self.action_type == PAGE_ACTION_TYPE
    }

    /// Check if the action may be imported next to `landings`
    ///
    /// A page action must open an existing landing page that does not
    /// already list the action itself.
    #[must_use]
    pub fn references_valid_page(&self, landings: &[LandingNode]) -> bool {
        if !self.launches_page() {
            return true;
        }

        landings
            .iter()
            .find(|landing| Some(landing.id()) == self.launch_page_id.as_deref())
            .is_some_and(|page| !page.record.actions.contains(&self.id))
    }
}

/// Action persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionRepository: Send + Sync {
    /// Every stored action
    async fn get_all(&self) -> LandingResult<Vec<PersistedAction>>;

    /// Insert or replace `items` by id, returning them
    async fn save(&self, items: Vec<PersistedAction>) -> LandingResult<Vec<PersistedAction>>;

    /// The given actions, in `ids` order
    async fn export(&self, ids: &[String]) -> LandingResult<Vec<PersistedAction>>;
}

/// [`ActionRepository`] over a [`Storage`] namespace
#[derive(Clone)]
pub struct ActionDefaultRepository {
    storage: Arc<dyn Storage>,
}

impl ActionDefaultRepository {
    /// Create new repository
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

impl std::fmt::Debug for ActionDefaultRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDefaultRepository").finish_non_exhaustive()
    }
}

#[async_trait]
impl ActionRepository for ActionDefaultRepository {
    async fn get_all(&self) -> LandingResult<Vec<PersistedAction>> {
        Ok(self
            .storage
            .get_object::<Vec<PersistedAction>>(ACTIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, items: Vec<PersistedAction>) -> LandingResult<Vec<PersistedAction>> {
        let mut stored = self.get_all().await?;

        for item in &items {
            match stored.iter_mut().find(|action| action.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => stored.push(item.clone()),
            }
        }

        tracing::debug!(saved = items.len(), stored = stored.len(), "saving actions");
        self.storage.save_object(ACTIONS_KEY, &stored).await?;
        Ok(items)
    }

    async fn export(&self, ids: &[String]) -> LandingResult<Vec<PersistedAction>> {
        let stored = self.get_all().await?;

        ids.iter()
            .map(|id| {
                stored
                    .iter()
                    .find(|action| &action.id == id)
                    .cloned()
                    .ok_or_else(|| LandingError::NotFound(id.clone()))
            })
            .collect()
    }
}

/// Import actions, refusing page actions that point nowhere
#[derive(Clone)]
pub struct ImportActionsUseCase {
    actions: Arc<dyn ActionRepository>,
    landings: Arc<dyn LandingNodeRepository>,
}

impl ImportActionsUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(actions: Arc<dyn ActionRepository>, landings: Arc<dyn LandingNodeRepository>) -> Self {
        Self { actions, landings }
    }

    /// Save `items` once every page action references a valid landing page
    ///
    /// Nothing is saved when one of them does not.
    ///
    /// # Errors
    /// - `LandingError::InvalidActionReference` naming the offending actions
    /// - any repository error
    pub async fn execute(&self, items: Vec<PersistedAction>) -> LandingResult<Vec<PersistedAction>> {
        let landings = self.landings.get_all().await?;

        let invalid: Vec<String> = items
            .iter()
            .filter(|action| !action.references_valid_page(&landings))
            .map(|action| action.id.clone())
            .collect();

        if !invalid.is_empty() {
            tracing::warn!(actions = ?invalid, "refusing action import");
            return Err(LandingError::InvalidActionReference { ids: invalid });
        }

        tracing::info!(actions = items.len(), "importing actions");
        self.actions.save(items).await
    }
}
