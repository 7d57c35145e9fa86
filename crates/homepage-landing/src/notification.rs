//! User notifications
//!
//! Notifications are stored as one list under [`NOTIFICATIONS_KEY`]. A
//! notification addresses users, groups and optionally a client wildcard;
//! every user who read it leaves a receipt in `readBy`.

use crate::access::{NamedRef, User};
use crate::error::LandingResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use homepage_storage::{Storage, StorageExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Storage key of the notification list
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Clients a notification is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationWildcard {
    /// Every client and every user
    All,
    /// Android client
    Android,
    /// Web client
    Web,
}

/// Who a notification is for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecipients {
    /// Addressed users
    #[serde(default)]
    pub users: Vec<NamedRef>,
    /// Addressed groups
    #[serde(default)]
    pub user_groups: Vec<NamedRef>,
    /// Client filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<NotificationWildcard>,
}

/// A user having read a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Reader id
    pub id: String,
    /// Reader display name
    #[serde(default)]
    pub name: String,
    /// When it was read
    pub date: DateTime<Utc>,
}

/// Message shown to users on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique id
    pub id: String,
    /// Message text
    pub content: String,
    /// Addressees
    #[serde(default)]
    pub recipients: NotificationRecipients,
    /// Read receipts, at most one per user
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if `user_id` left a read receipt
    #[must_use]
    pub fn is_read_by(&self, user_id: &str) -> bool {
        self.read_by.iter().any(|receipt| receipt.id == user_id)
    }

    /// Check if `user` is addressed directly or through a group
    #[must_use]
    pub fn is_addressed_to(&self, user: &User) -> bool {
        user.is_member(&self.recipients.users, &self.recipients.user_groups)
    }

    /// Add a receipt for `user` unless there is one already
    pub fn mark_read(&mut self, user: &User, at: DateTime<Utc>) {
        if self.is_read_by(&user.id) {
            return;
        }
        self.read_by.push(ReadReceipt {
            id: user.id.clone(),
            name: user.name.clone(),
            date: at,
        });
    }
}

/// Filters of [`NotificationRepository::list`]; unset filters match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationListOptions {
    /// Accepted wildcards; `ALL` is always accepted once this is set
    pub wildcard: Option<Vec<NotificationWildcard>>,
    /// Keep only notifications addressed to this user
    pub user: Option<User>,
    /// With `user`, keep only notifications this user has (or has not) read
    pub is_read: Option<bool>,
}

impl NotificationListOptions {
    /// Check if `notification` passes every filter
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        self.matches_wildcard(notification) && self.matches_user(notification)
    }

    fn matches_wildcard(&self, notification: &Notification) -> bool {
        match (notification.recipients.wildcard, &self.wildcard) {
            (None, _) | (_, None) | (Some(NotificationWildcard::All), Some(_)) => true,
            (Some(wildcard), Some(accepted)) => accepted.contains(&wildcard),
        }
    }

    fn matches_user(&self, notification: &Notification) -> bool {
        let Some(user) = &self.user else {
            return true;
        };

        notification.is_addressed_to(user)
            && self
                .is_read
                .map_or(true, |is_read| notification.is_read_by(&user.id) == is_read)
    }
}

/// Merge `updates` into `existing`, by id
///
/// An updated notification takes the update's fields, and its receipts are
/// the union of both lists with one receipt per user, the update's first.
/// Updates for unknown ids are ignored and the last update of a repeated id
/// wins.
#[must_use]
pub fn merge_notifications(existing: Vec<Notification>, updates: &[Notification]) -> Vec<Notification> {
    let by_id: HashMap<&str, &Notification> = updates.iter().map(|n| (n.id.as_str(), n)).collect();

    existing
        .into_iter()
        .map(|stored| match by_id.get(stored.id.as_str()) {
            None => stored,
            Some(update) => {
                let mut seen = HashSet::new();
                let read_by = update
                    .read_by
                    .iter()
                    .chain(&stored.read_by)
                    .filter(|receipt| seen.insert(receipt.id.clone()))
                    .cloned()
                    .collect();

                Notification {
                    read_by,
                    ..(*update).clone()
                }
            }
        })
        .collect()
}

/// Notification persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Stored notifications passing `options`, stored order
    async fn list(&self, options: &NotificationListOptions) -> LandingResult<Vec<Notification>>;

    /// Merge `updates` into the stored notifications
    async fn save(&self, updates: &[Notification]) -> LandingResult<()>;
}

/// [`NotificationRepository`] over a [`Storage`] namespace
#[derive(Clone)]
pub struct NotificationDefaultRepository {
    storage: Arc<dyn Storage>,
}

impl NotificationDefaultRepository {
    /// Create new repository
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn get_stored(&self) -> LandingResult<Vec<Notification>> {
        Ok(self
            .storage
            .get_object::<Vec<Notification>>(NOTIFICATIONS_KEY)
            .await?
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for NotificationDefaultRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDefaultRepository").finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationRepository for NotificationDefaultRepository {
    async fn list(&self, options: &NotificationListOptions) -> LandingResult<Vec<Notification>> {
        let mut notifications = self.get_stored().await?;
        notifications.retain(|notification| options.matches(notification));
        Ok(notifications)
    }

    async fn save(&self, updates: &[Notification]) -> LandingResult<()> {
        let merged = merge_notifications(self.get_stored().await?, updates);

        tracing::debug!(updates = updates.len(), stored = merged.len(), "saving notifications");
        self.storage.save_object(NOTIFICATIONS_KEY, &merged).await?;
        Ok(())
    }
}

/// Unread notifications of the current user on the web client
#[derive(Clone)]
pub struct ListCurrentUserNotificationsUseCase {
    repository: Arc<dyn NotificationRepository>,
}

impl ListCurrentUserNotificationsUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Notifications `user` should see
    ///
    /// `ALL` notifications are always shown; others only while addressed to
    /// the user and not yet read by them.
    ///
    /// # Errors
    /// Any repository error
    pub async fn execute(&self, user: &User) -> LandingResult<Vec<Notification>> {
        let options = NotificationListOptions {
            wildcard: Some(vec![NotificationWildcard::All, NotificationWildcard::Web]),
            ..NotificationListOptions::default()
        };

        let mut notifications = self.repository.list(&options).await?;
        notifications.retain(|notification| {
            notification.recipients.wildcard == Some(NotificationWildcard::All)
                || (notification.is_addressed_to(user) && !notification.is_read_by(&user.id))
        });

        Ok(notifications)
    }
}

/// Record that the current user read some notifications
#[derive(Clone)]
pub struct ReadCurrentUserNotificationsUseCase {
    repository: Arc<dyn NotificationRepository>,
}

impl ReadCurrentUserNotificationsUseCase {
    /// Create new use case
    #[must_use]
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }

    /// Add a receipt for `user` to each of `notifications` and save them
    ///
    /// # Errors
    /// Any repository error
    pub async fn execute(&self, mut notifications: Vec<Notification>, user: &User) -> LandingResult<()> {
        let now = Utc::now();
        for notification in &mut notifications {
            notification.mark_read(user, now);
        }

        self.repository.save(&notifications).await
    }
}
