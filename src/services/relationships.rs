// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{activity, current_user, notifications, require_user};
use crate::error::{ApiResult, AppError};
use crate::metrics::RELATIONSHIP_CHANGES;
use crate::models::{Activity, ActivityType, NewNotification, NotificationType, RelationshipError};
use crate::store::Store;

impl From<RelationshipError> for AppError {
    fn from(err: RelationshipError) -> Self {
        match err {
            RelationshipError::Blocked => AppError::forbidden(err.to_string()),
            _ => AppError::bad_request(err.to_string()),
        }
    }
}

fn reject_self(actor_id: Uuid, target_id: Uuid, verb: &'static str) -> ApiResult<()> {
    if actor_id == target_id {
        warn!("User {} tried to {} themself", actor_id, verb);
        return Err(RelationshipError::SelfAction(verb).into());
    }
    Ok(())
}

pub async fn follow(store: &dyn Store, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
    reject_self(actor_id, target_id, "follow")?;
    let actor = current_user(store, actor_id).await?;
    let target = require_user(store, target_id).await?;
    actor.check_follow(&target)?;

    store.add_follow(actor.id, target.id).await?;
    RELATIONSHIP_CHANGES.with_label_values(&["follow"]).inc();
    info!("User {} followed {}", actor.id, target.id);

    activity::record(
        store,
        Activity::new(actor.id, ActivityType::UserFollow, Utc::now()).with_target_user(target.id),
    )
    .await;
    notifications::notify(
        store,
        NewNotification::new(target.id, actor.id, NotificationType::Follow),
    )
    .await;
    Ok(())
}

pub async fn unfollow(store: &dyn Store, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
    reject_self(actor_id, target_id, "unfollow")?;
    let actor = current_user(store, actor_id).await?;
    let target = require_user(store, target_id).await?;
    actor.check_unfollow(&target)?;

    store.remove_follow(actor.id, target.id).await?;
    RELATIONSHIP_CHANGES.with_label_values(&["unfollow"]).inc();
    info!("User {} unfollowed {}", actor.id, target.id);
    Ok(())
}

/// Block `target_id`, dropping follow edges in both directions
pub async fn block(store: &dyn Store, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
    reject_self(actor_id, target_id, "block")?;
    let actor = current_user(store, actor_id).await?;
    let target = require_user(store, target_id).await?;
    actor.check_block(&target)?;

    store.add_block(actor.id, target.id).await?;
    RELATIONSHIP_CHANGES.with_label_values(&["block"]).inc();
    info!("User {} blocked {}", actor.id, target.id);
    Ok(())
}

pub async fn unblock(store: &dyn Store, actor_id: Uuid, target_id: Uuid) -> ApiResult<()> {
    reject_self(actor_id, target_id, "unblock")?;
    let actor = current_user(store, actor_id).await?;
    let target = require_user(store, target_id).await?;
    actor.check_unblock(&target)?;

    store.remove_block(actor.id, target.id).await?;
    RELATIONSHIP_CHANGES.with_label_values(&["unblock"]).inc();
    info!("User {} unblocked {}", actor.id, target.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, User};
    use crate::store::MemoryStore;
    use tokio_test::{assert_err, assert_ok};
    use tracing_test::traced_test;

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
    async fn follow_records_activity_and_notifies() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;

        follow(&store, ana.id, ben.id).await.unwrap();

        let notes = store.list_notifications(ben.id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification_type, NotificationType::Follow);

        let err = follow(&store, ana.id, ben.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Already following this user");
    }

    #[tokio::test]
    async fn blocked_pairs_cannot_follow() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;
        block(&store, ben.id, ana.id).await.unwrap();

        let err = follow(&store, ana.id, ben.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn self_and_missing_targets() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;

        let err = block(&store, ana.id, ana.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot block yourself");
        let err = unfollow(&store, ana.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = unblock(&store, ana.id, ana.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    #[traced_test]
    async fn unfollow_reverses_follow() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;

        assert_err!(unfollow(&store, ana.id, ben.id).await);
        assert_ok!(follow(&store, ana.id, ben.id).await);
        assert_ok!(unfollow(&store, ana.id, ben.id).await);

        let ana = store.get_user(ana.id).await.unwrap().unwrap();
        let ben = store.get_user(ben.id).await.unwrap().unwrap();
        assert!(ana.following.is_empty());
        assert!(ben.followers.is_empty());
        assert!(logs_contain("unfollowed"));
    }
}
