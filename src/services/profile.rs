// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::views::UserSummary;
use super::{current_user, require_user, Page, Pagination};
use crate::error::{ApiResult, AppError};
use crate::models::{NotificationPreferences, PrivacyPreferences, ProfileChanges, User, UserStats};
use crate::store::Store;
use crate::validation::Validator;

/// A user as seen by `viewer`
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    /// Present for the owner, or when the owner shows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub image: Option<String>,
    pub cover_image: Option<String>,
    pub bio: Option<String>,
    pub stats: UserStats,
    pub is_following: bool,
    pub is_blocked: bool,
    pub is_self: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_users: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_preferences: Option<NotificationPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy_preferences: Option<PrivacyPreferences>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user: &User, stats: UserStats, viewer: Option<&User>) -> Self {
        let is_self = viewer.map_or(false, |v| v.id == user.id);
        Self {
            id: user.id,
            name: user.name.clone(),
            email: (is_self || user.privacy_preferences.show_email).then(|| user.email.clone()),
            image: user.image.clone(),
            cover_image: user.cover_image.clone(),
            bio: user.bio.clone(),
            stats,
            is_following: viewer.map_or(false, |v| v.is_following(user.id)),
            is_blocked: viewer.map_or(false, |v| v.has_blocked(user.id)),
            is_self,
            blocked_users: is_self.then(|| user.blocked_users.clone()),
            notification_preferences: is_self.then(|| user.notification_preferences.clone()),
            privacy_preferences: is_self.then(|| user.privacy_preferences.clone()),
            created_at: user.created_at,
        }
    }
}

fn ensure_visible(user: &User, viewer_id: Option<Uuid>) -> ApiResult<()> {
    if !user.privacy_preferences.profile_visibility && viewer_id != Some(user.id) {
        return Err(AppError::forbidden("This profile is private"));
    }
    Ok(())
}

/// Profile of `user_id`; private profiles are only visible to their owner
pub async fn get_user_profile(
    store: &dyn Store,
    user_id: Uuid,
    viewer_id: Option<Uuid>,
) -> ApiResult<UserProfile> {
    debug!("Getting profile {} for viewer {:?}", user_id, viewer_id);
    let user = require_user(store, user_id).await?;
    ensure_visible(&user, viewer_id)?;

    let viewer = match viewer_id {
        Some(id) if id == user.id => Some(user.clone()),
        Some(id) => store.get_user(id).await?,
        None => None,
    };
    let recipes = store.count_recipes_by_author(user.id).await?;
    Ok(UserProfile::new(&user, user.stats(recipes), viewer.as_ref()))
}

pub async fn own_profile(store: &dyn Store, user_id: Uuid) -> ApiResult<UserProfile> {
    let user = current_user(store, user_id).await?;
    let recipes = store.count_recipes_by_author(user.id).await?;
    Ok(UserProfile::new(&user, user.stats(recipes), Some(&user)))
}

/// Body of `PATCH /api/user`; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    #[serde(alias = "coverImage")]
    pub cover_image: Option<String>,
}

impl UpdateProfileRequest {
    /// Validate and normalise into store changes
    pub fn into_changes(self) -> ApiResult<ProfileChanges> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            v.name(name, "name");
        }
        if let Some(email) = &self.email {
            v.email(email, "email");
        }
        if let Some(bio) = &self.bio {
            v.bio(bio, "bio");
        }
        if let Some(image) = &self.image {
            v.url(image, "image");
        }
        if let Some(cover) = &self.cover_image {
            v.url(cover, "cover_image");
        }
        v.finish()?;

        Ok(ProfileChanges {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| e.trim().to_lowercase()),
            bio: self.bio.map(|b| b.trim().to_string()),
            image: self.image,
            cover_image: self.cover_image,
        })
    }
}

pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> ApiResult<UserProfile> {
    let changes = request.into_changes()?;
    let user = current_user(store, user_id).await?;

    let user = if changes.is_empty() {
        user
    } else {
        let updated = store
            .update_profile(user.id, &changes)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        info!("Updated profile of {}", updated.id);
        updated
    };

    let recipes = store.count_recipes_by_author(user.id).await?;
    Ok(UserProfile::new(&user, user.stats(recipes), Some(&user)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Followers,
    Following,
}

#[derive(Debug, Serialize)]
pub struct ConnectionList {
    pub users: Vec<UserSummary>,
    pub pagination: Pagination,
}

/// A page of the user's followers or followed users
pub async fn list_connections(
    store: &dyn Store,
    user_id: Uuid,
    viewer_id: Option<Uuid>,
    which: Connection,
    page: Page,
) -> ApiResult<ConnectionList> {
    let user = require_user(store, user_id).await?;
    ensure_visible(&user, viewer_id)?;

    let ids = match which {
        Connection::Followers => &user.followers,
        Connection::Following => &user.following,
    };
    let users = store.get_users(&page.slice(ids)).await?;
    Ok(ConnectionList {
        users: users.iter().map(UserSummary::from).collect(),
        pagination: page.pagination(ids.len() as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, PreferenceGroup};
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
    async fn email_and_blocked_list_are_private_by_default() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        let ben = user(&store, "ben").await;

        let seen_by_ben = get_user_profile(&store, ana.id, Some(ben.id)).await.unwrap();
        assert!(seen_by_ben.email.is_none());
        assert!(seen_by_ben.blocked_users.is_none());
        assert!(!seen_by_ben.is_self);

        let own = get_user_profile(&store, ana.id, Some(ana.id)).await.unwrap();
        assert_eq!(own.email.as_deref(), Some("ana@example.com"));
        assert!(own.blocked_users.is_some());
    }

    #[tokio::test]
    async fn private_profiles_are_forbidden_to_others() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        store
            .set_preference(ana.id, PreferenceGroup::Privacy, "profile_visibility", false)
            .await
            .unwrap();

        let err = get_user_profile(&store, ana.id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(get_user_profile(&store, ana.id, Some(ana.id)).await.is_ok());
    }

    #[tokio::test]
    async fn bio_with_links_or_markup_is_rejected() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;

        for bio in ["see http://spam.example", "visit www.example.com", "<b>chef</b>", "{x}"] {
            let request = UpdateProfileRequest { bio: Some(bio.into()), ..Default::default() };
            let err = update_profile(&store, ana.id, request).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "accepted {:?}", bio);
        }

        let request = UpdateProfileRequest { bio: Some("  Home cook  ".into()), ..Default::default() };
        let profile = update_profile(&store, ana.id, request).await.unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Home cook"));
    }

    #[tokio::test]
    async fn taken_email_is_a_conflict() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        user(&store, "ben").await;

        let request = UpdateProfileRequest {
            email: Some("BEN@example.com".into()),
            ..Default::default()
        };
        let err = update_profile(&store, ana.id, request).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
