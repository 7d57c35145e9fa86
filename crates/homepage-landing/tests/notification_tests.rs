//! Notification Repository Tests
//!
//! Recipient filtering and read receipt merging over a stored list.

use chrono::{DateTime, TimeZone, Utc};
use homepage_landing::{
    ListCurrentUserNotificationsUseCase, NamedRef, Notification, NotificationDefaultRepository,
    NotificationListOptions, NotificationRecipients, NotificationRepository, NotificationWildcard,
    ReadCurrentUserNotificationsUseCase, ReadReceipt, User, NOTIFICATIONS_KEY,
};
use homepage_storage::InMemoryStorage;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
}

fn user() -> User {
    User {
        id: "u1".into(),
        name: "User One".into(),
        user_groups: vec![NamedRef::id("g1")],
    }
}

fn receipt(id: &str, day: u32) -> ReadReceipt {
    ReadReceipt {
        id: id.into(),
        name: id.to_uppercase(),
        date: at(day),
    }
}

fn notification(
    id: &str,
    wildcard: Option<NotificationWildcard>,
    users: &[&str],
    groups: &[&str],
    read_by: Vec<ReadReceipt>,
) -> Notification {
    Notification {
        id: id.into(),
        content: format!("About {id}"),
        recipients: NotificationRecipients {
            users: users.iter().map(|u| NamedRef::id(*u)).collect(),
            user_groups: groups.iter().map(|g| NamedRef::id(*g)).collect(),
            wildcard,
        },
        read_by,
        created_at: at(1),
    }
}

fn stored() -> Vec<Notification> {
    vec![
        notification("direct", None, &["u1"], &[], Vec::new()),
        notification("group", Some(NotificationWildcard::Web), &[], &["g1"], vec![receipt("u1", 2)]),
        notification("android", Some(NotificationWildcard::Android), &["u1"], &[], Vec::new()),
        notification("broadcast", Some(NotificationWildcard::All), &[], &[], Vec::new()),
        notification("stranger", None, &["u2"], &["g2"], Vec::new()),
    ]
}

fn store(notifications: &[Notification]) -> Arc<InMemoryStorage> {
    Arc::new(
        InMemoryStorage::new()
            .with_entry(NOTIFICATIONS_KEY, serde_json::to_value(notifications).unwrap()),
    )
}

fn ids(notifications: &[Notification]) -> Vec<&str> {
    notifications.iter().map(|n| n.id.as_str()).collect()
}

#[tokio::test]
async fn no_options_lists_everything() {
    let repository = NotificationDefaultRepository::new(store(&stored()));

    let all = repository.list(&NotificationListOptions::default()).await.unwrap();
    assert_eq!(all, stored());
}

#[tokio::test]
async fn missing_key_lists_nothing() {
    let repository = NotificationDefaultRepository::new(Arc::new(InMemoryStorage::new()));
    assert!(repository.list(&NotificationListOptions::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn wildcard_filter_always_accepts_all() {
    let repository = NotificationDefaultRepository::new(store(&stored()));
    let options = NotificationListOptions {
        wildcard: Some(vec![NotificationWildcard::Web]),
        ..NotificationListOptions::default()
    };

    let listed = repository.list(&options).await.unwrap();
    assert_eq!(ids(&listed), vec!["direct", "group", "broadcast", "stranger"]);
}

#[tokio::test]
async fn user_filter_matches_users_and_groups() {
    let repository = NotificationDefaultRepository::new(store(&stored()));
    let options = NotificationListOptions {
        user: Some(user()),
        ..NotificationListOptions::default()
    };

    let listed = repository.list(&options).await.unwrap();
    assert_eq!(ids(&listed), vec!["direct", "group", "android"]);
}

#[tokio::test]
async fn read_status_filter_needs_a_user() {
    let repository = NotificationDefaultRepository::new(store(&stored()));

    let unread = NotificationListOptions {
        user: Some(user()),
        is_read: Some(false),
        ..NotificationListOptions::default()
    };
    assert_eq!(ids(&repository.list(&unread).await.unwrap()), vec!["direct", "android"]);

    let read = NotificationListOptions {
        is_read: Some(true),
        ..unread.clone()
    };
    assert_eq!(ids(&repository.list(&read).await.unwrap()), vec!["group"]);

    let without_user = NotificationListOptions {
        is_read: Some(true),
        ..NotificationListOptions::default()
    };
    assert_eq!(repository.list(&without_user).await.unwrap().len(), 5);
}

#[tokio::test]
async fn save_merges_receipts_without_duplicates() {
    let storage = store(&stored());
    let repository = NotificationDefaultRepository::new(storage.clone());

    // u1 already read "group" on day 2; the update repeats u1 and adds u3
    let mut update = notification("group", Some(NotificationWildcard::Web), &[], &["g1"], Vec::new());
    update.content = "Edited".into();
    update.read_by = vec![receipt("u3", 5), receipt("u1", 6)];
    let unknown = notification("unknown", None, &["u1"], &[], vec![receipt("u1", 5)]);

    repository.save(&[update, unknown]).await.unwrap();

    let all = repository.list(&NotificationListOptions::default()).await.unwrap();
    assert_eq!(ids(&all), ids(&stored()));

    let group = &all[1];
    assert_eq!(group.content, "Edited");
    let readers: Vec<(&str, DateTime<Utc>)> =
        group.read_by.iter().map(|r| (r.id.as_str(), r.date)).collect();
    assert_eq!(readers, vec![("u3", at(5)), ("u1", at(6))]);

    assert_eq!(all[0], stored()[0]);
}

#[tokio::test]
async fn stored_documents_decode() {
    let storage = Arc::new(InMemoryStorage::new().with_entry(
        NOTIFICATIONS_KEY,
        json!([{
            "id": "n1",
            "content": "Maintenance tonight",
            "recipients": { "users": [{ "id": "u1", "name": "One" }], "userGroups": [] },
            "readBy": [],
            "createdAt": "2024-03-01T09:00:00.000Z"
        }]),
    ));
    let repository = NotificationDefaultRepository::new(storage);

    let listed = repository.list(&NotificationListOptions::default()).await.unwrap();
    assert_eq!(listed[0].created_at, at(1));
    assert_eq!(listed[0].recipients.wildcard, None);
}

#[tokio::test]
async fn current_user_sees_unread_and_broadcasts() {
    let repository = Arc::new(NotificationDefaultRepository::new(store(&stored())));
    let use_case = ListCurrentUserNotificationsUseCase::new(repository);

    let visible = use_case.execute(&user()).await.unwrap();

    // "group" is read and "android" targets another client
    assert_eq!(ids(&visible), vec!["direct", "broadcast"]);
}

#[tokio::test]
async fn reading_hides_notifications_from_the_list() {
    let repository = Arc::new(NotificationDefaultRepository::new(store(&stored())));
    let list = ListCurrentUserNotificationsUseCase::new(repository.clone());
    let read = ReadCurrentUserNotificationsUseCase::new(repository.clone());

    let visible = list.execute(&user()).await.unwrap();
    read.execute(visible, &user()).await.unwrap();

    assert_eq!(ids(&list.execute(&user()).await.unwrap()), vec!["broadcast"]);

    let all = repository.list(&NotificationListOptions::default()).await.unwrap();
    let direct_readers: Vec<&str> = all[0].read_by.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(direct_readers, vec!["User One"]);
}
