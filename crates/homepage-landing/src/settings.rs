//! App settings stored under [`APP_CONFIG_KEY`]
//!
//! The document records who may open the settings, the sharing of each
//! landing page and whether pages list every action. Other parts of the app
//! keep their own keys in the same document; those keys are written back
//! untouched.

use crate::access::{LandingPagePermission, NamedRef, READ_PUBLIC_ACCESS};
use crate::error::LandingResult;
use async_trait::async_trait;
use homepage_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Storage key of the settings document
pub const APP_CONFIG_KEY: &str = "config";

/// Users and groups granted something
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Users granted access
    #[serde(default)]
    pub users: Vec<NamedRef>,
    /// Groups whose members are granted access
    #[serde(default)]
    pub user_groups: Vec<NamedRef>,
}

/// Partial sharing change; unset fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionUpdate {
    /// New user list
    pub users: Option<Vec<NamedRef>>,
    /// New group list
    pub user_groups: Option<Vec<NamedRef>>,
    /// New public access string; landing page permissions only
    pub public_access: Option<String>,
}

impl PermissionUpdate {
    fn apply(self, users: &mut Vec<NamedRef>, user_groups: &mut Vec<NamedRef>) {
        if let Some(new_users) = self.users {
            *users = new_users;
        }
        if let Some(new_groups) = self.user_groups {
            *user_groups = new_groups;
        }
    }
}

/// Settings document as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    /// Who may open the settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_permissions: Option<Permission>,
    /// Sharing of individual landing nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_page_permissions: Option<Vec<LandingPagePermission>>,
    /// List every action on a page, not only the page's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all_actions: Option<bool>,
    /// Keys owned by other parts of the app
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Who may open the settings; empty lists when never set
    async fn get_settings_permissions(&self) -> LandingResult<Permission>;

    /// Change who may open the settings
    async fn update_settings_permissions(&self, update: PermissionUpdate) -> LandingResult<()>;

    /// Sharing of every landing node that has settings
    async fn get_landing_page_permissions(&self) -> LandingResult<Vec<LandingPagePermission>>;

    /// Change the sharing of node `id`
    async fn update_landing_page_permissions(&self, update: PermissionUpdate, id: &str) -> LandingResult<()>;

    /// Whether pages list every action; `true` when never set
    async fn get_show_all_actions(&self) -> LandingResult<bool>;

    /// Store whether pages list every action
    async fn set_show_all_actions(&self, show_all_actions: bool) -> LandingResult<()>;
}

/// [`ConfigRepository`] over a [`Storage`] namespace
#[derive(Clone)]
pub struct ConfigDefaultRepository {
    storage: Arc<dyn Storage>,
}

impl ConfigDefaultRepository {
    /// Create new repository
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn get_config(&self) -> LandingResult<PersistedConfig> {
        Ok(self
            .storage
            .get_object::<PersistedConfig>(APP_CONFIG_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save_config(&self, config: &PersistedConfig) -> LandingResult<()> {
        self.storage.save_object(APP_CONFIG_KEY, config).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ConfigDefaultRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDefaultRepository").finish_non_exhaustive()
    }
}

#[async_trait]
impl ConfigRepository for ConfigDefaultRepository {
    async fn get_settings_permissions(&self) -> LandingResult<Permission> {
        Ok(self.get_config().await?.settings_permissions.unwrap_or_default())
    }

    async fn update_settings_permissions(&self, update: PermissionUpdate) -> LandingResult<()> {
        let mut config = self.get_config().await?;
        let permission = config.settings_permissions.get_or_insert_with(Permission::default);
        update.apply(&mut permission.users, &mut permission.user_groups);

        tracing::info!(
            users = permission.users.len(),
            user_groups = permission.user_groups.len(),
            "updated settings permissions"
        );
        self.save_config(&config).await
    }

    async fn get_landing_page_permissions(&self) -> LandingResult<Vec<LandingPagePermission>> {
        Ok(self.get_config().await?.landing_page_permissions.unwrap_or_default())
    }

    async fn update_landing_page_permissions(&self, update: PermissionUpdate, id: &str) -> LandingResult<()> {
        let mut config = self.get_config().await?;
        let permissions = config.landing_page_permissions.get_or_insert_with(Vec::new);

        let position = match permissions.iter().position(|p| p.id == id) {
            Some(position) => position,
            None => {
                // A node without settings is visible to everyone
                permissions.push(LandingPagePermission {
                    id: id.to_string(),
                    public_access: READ_PUBLIC_ACCESS.to_string(),
                    ..LandingPagePermission::default()
                });
                permissions.len() - 1
            }
        };

        let permission = &mut permissions[position];
        if let Some(public_access) = update.public_access.clone() {
            permission.public_access = public_access;
        }
        update.apply(&mut permission.users, &mut permission.user_groups);

        tracing::info!(id, public_access = %permission.public_access, "updated landing page permissions");
        self.save_config(&config).await
    }

    async fn get_show_all_actions(&self) -> LandingResult<bool> {
        Ok(self.get_config().await?.show_all_actions.unwrap_or(true))
    }

    async fn set_show_all_actions(&self, show_all_actions: bool) -> LandingResult<()> {
        let mut config = self.get_config().await?;
        config.show_all_actions = Some(show_all_actions);
        self.save_config(&config).await
    }
}
