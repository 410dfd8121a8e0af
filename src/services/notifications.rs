// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::views::{CommentSummary, CookbookSummary, RecipeSummary, UserSummary};
use crate::error::{ApiResult, AppError};
use crate::metrics::NOTIFICATIONS;
use crate::models::{NewNotification, NotificationType, User};
use crate::store::{Store, StoreResult};

/// Whether `recipient` wants a notification of `kind` from `sender_id`
pub fn should_deliver(recipient: &User, sender_id: Uuid, kind: NotificationType) -> bool {
    if recipient.id == sender_id || recipient.has_blocked(sender_id) {
        return false;
    }
    let prefs = &recipient.notification_preferences;
    match kind {
        NotificationType::Follow => prefs.new_follower,
        NotificationType::Comment => prefs.new_comment,
        NotificationType::Like => prefs.recipe_likes,
        NotificationType::Mention => recipient.privacy_preferences.allow_mentions,
        NotificationType::CookbookAdd | NotificationType::RecipeSave => true,
    }
}

async fn deliver(store: &dyn Store, new: NewNotification) -> StoreResult<bool> {
    if new.recipient_id == new.sender_id {
        return Ok(false);
    }
    let recipient = match store.get_user(new.recipient_id).await? {
        Some(user) => user,
        None => return Ok(false),
    };
    if !should_deliver(&recipient, new.sender_id, new.notification_type) {
        return Ok(false);
    }
    store
        .insert_notification(&new.into_notification(Utc::now()))
        .await?;
    Ok(true)
}

/// Fan a notification out to its recipient. Failures are logged, not returned.
pub async fn notify(store: &dyn Store, new: NewNotification) -> bool {
    let kind = new.notification_type;
    let recipient = new.recipient_id;
    match deliver(store, new).await {
        Ok(delivered) => {
            let outcome = if delivered { "delivered" } else { "skipped" };
            NOTIFICATIONS.with_label_values(&[kind.as_str(), outcome]).inc();
            debug!("Notification {} for {}: {}", kind, recipient, outcome);
            delivered
        }
        Err(e) => {
            NOTIFICATIONS.with_label_values(&[kind.as_str(), "failed"]).inc();
            warn!("Failed to deliver {} notification to {}: {}", kind, recipient, e);
            false
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub read: bool,
    pub message: String,
    pub sender: Option<UserSummary>,
    pub recipe: Option<RecipeSummary>,
    pub cookbook: Option<CookbookSummary>,
    pub comment: Option<CommentSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<NotificationView>,
    pub unread: i64,
}

/// Newest first, with senders and targets resolved
pub async fn list(store: &dyn Store, recipient_id: Uuid) -> ApiResult<NotificationList> {
    let notifications = store.list_notifications(recipient_id).await?;
    let unread = store.count_unread_notifications(recipient_id).await?;

    let mut sender_ids: Vec<Uuid> = notifications.iter().map(|n| n.sender_id).collect();
    sender_ids.sort();
    sender_ids.dedup();
    let recipe_ids: Vec<Uuid> = notifications.iter().filter_map(|n| n.recipe_id).collect();
    let cookbook_ids: Vec<Uuid> = notifications.iter().filter_map(|n| n.cookbook_id).collect();
    let comment_ids: Vec<Uuid> = notifications.iter().filter_map(|n| n.comment_id).collect();

    let senders: HashMap<Uuid, User> = store
        .get_users(&sender_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let recipes: HashMap<Uuid, RecipeSummary> = store
        .get_recipes(&recipe_ids)
        .await?
        .iter()
        .map(|r| (r.id, RecipeSummary::from(r)))
        .collect();
    let cookbooks: HashMap<Uuid, CookbookSummary> = store
        .get_cookbooks(&cookbook_ids)
        .await?
        .iter()
        .map(|c| (c.id, CookbookSummary::from(c)))
        .collect();
    let comments: HashMap<Uuid, CommentSummary> = store
        .get_comments(&comment_ids)
        .await?
        .iter()
        .map(|c| (c.id, CommentSummary::from(c)))
        .collect();

    let views = notifications
        .into_iter()
        .map(|n| {
            let sender = senders.get(&n.sender_id);
            let sender_name = sender.map(|s| s.name.as_str()).unwrap_or("Someone");
            NotificationView {
                id: n.id,
                notification_type: n.notification_type,
                read: n.read,
                message: n.notification_type.message(sender_name),
                sender: sender.map(UserSummary::from),
                recipe: n.recipe_id.and_then(|id| recipes.get(&id).cloned()),
                cookbook: n.cookbook_id.and_then(|id| cookbooks.get(&id).cloned()),
                comment: n.comment_id.and_then(|id| comments.get(&id).cloned()),
                created_at: n.created_at,
            }
        })
        .collect();

    Ok(NotificationList { notifications: views, unread })
}

/// Body of `PUT /api/notifications`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "notification_ids")]
    pub notification_ids: Option<Vec<Uuid>>,
}

pub async fn mark_read(
    store: &dyn Store,
    recipient_id: Uuid,
    request: MarkReadRequest,
) -> ApiResult<u64> {
    match (request.action.as_deref(), request.notification_ids) {
        (Some("markAllRead"), _) => Ok(store.mark_all_notifications_read(recipient_id).await?),
        (Some(other), _) => Err(AppError::bad_request(format!("Unknown action '{}'", other))),
        (None, Some(ids)) => Ok(store.mark_notifications_read(recipient_id, &ids).await?),
        (None, None) => Err(AppError::bad_request(
            "Provide an action or a list of notification ids",
        )),
    }
}

/// Delete one notification, or all of them with `all`
pub async fn delete(
    store: &dyn Store,
    recipient_id: Uuid,
    all: bool,
    id: Option<Uuid>,
) -> ApiResult<u64> {
    if all {
        return Ok(store.delete_all_notifications(recipient_id).await?);
    }
    let id = id.ok_or_else(|| AppError::bad_request("Notification ID is required"))?;
    if store.delete_notification(recipient_id, id).await? {
        Ok(1)
    } else {
        Err(AppError::not_found("Notification not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::MemoryStore;

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{}@example.com", name),
                password_hash: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn self_notifications_are_skipped() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let delivered = notify(&store, NewNotification::new(ana.id, ana.id, NotificationType::Follow)).await;
        assert!(!delivered);
        assert!(store.list_notifications(ana.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preferences_gate_delivery() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;

        // recipe_likes is off by default
        assert!(!notify(&store, NewNotification::new(ana.id, ben.id, NotificationType::Like)).await);
        assert!(notify(&store, NewNotification::new(ana.id, ben.id, NotificationType::Follow)).await);
        assert!(notify(&store, NewNotification::new(ana.id, ben.id, NotificationType::CookbookAdd)).await);
        assert_eq!(store.count_unread_notifications(ana.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn blocked_senders_are_silenced() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;
        store.add_block(ana.id, ben.id).await.unwrap();

        assert!(!notify(&store, NewNotification::new(ana.id, ben.id, NotificationType::RecipeSave)).await);
    }

    #[tokio::test]
    async fn mark_read_needs_an_action_or_ids() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let err = mark_read(&store, ana.id, MarkReadRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = delete(&store, ana.id, false, None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn mention_respects_privacy_flag() {
        let mut ana = User::new(
            NewUser { name: "ana".into(), email: "ana@example.com".into(), password_hash: None },
            Utc::now(),
        );
        let sender = Uuid::new_v4();
        assert!(should_deliver(&ana, sender, NotificationType::Mention));
        ana.privacy_preferences.allow_mentions = false;
        assert!(!should_deliver(&ana, sender, NotificationType::Mention));
    }
}
