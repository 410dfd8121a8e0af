// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::current_user;
use super::profile::UserProfile;
use crate::auth::{hash_password, verify_password, SessionKeys};
use crate::error::{ApiResult, AppError};
use crate::models::{
    Comment, Cookbook, NewUser, NotificationPreferences, PreferenceGroup, PrivacyPreferences, Recipe,
    RecipeQuery, User, UserStats,
};
use crate::store::Store;
use crate::validation::Validator;

/// Hashing runs on the blocking pool
async fn hash_blocking(password: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("Password hashing task failed")??;
    Ok(hash)
}

async fn verify_blocking(password: String, hash: String) -> ApiResult<bool> {
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .context("Password verification task failed")?;
    Ok(ok)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub async fn register(
    store: &dyn Store,
    sessions: &SessionKeys,
    request: RegisterRequest,
) -> ApiResult<AuthResponse> {
    let mut v = Validator::new();
    v.name(&request.name, "name")
        .email(&request.email, "email")
        .password(&request.password, "password");
    v.finish()?;

    let password_hash = hash_blocking(request.password).await?;
    let user = store
        .insert_user(NewUser {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password_hash: Some(password_hash),
        })
        .await?;
    info!("Registered user {}", user.id);

    let token = sessions.issue(user.id)?;
    Ok(AuthResponse {
        token,
        user: UserProfile::new(&user, user.stats(0), Some(&user)),
    })
}

pub async fn login(
    store: &dyn Store,
    sessions: &SessionKeys,
    request: LoginRequest,
) -> ApiResult<AuthResponse> {
    let email = request.email.trim().to_lowercase();
    let user = store
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    let hash = user.password_hash.clone().ok_or(AppError::InvalidCredentials)?;
    if !verify_blocking(request.password, hash).await? {
        warn!("Failed login for {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let token = sessions.issue(user.id)?;
    let recipes = store.count_recipes_by_author(user.id).await?;
    info!("User {} signed in", user.id);
    Ok(AuthResponse {
        token,
        user: UserProfile::new(&user, user.stats(recipes), Some(&user)),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

pub async fn change_password(
    store: &dyn Store,
    user_id: Uuid,
    request: ChangePasswordRequest,
) -> ApiResult<()> {
    let mut v = Validator::new();
    v.check(
        !request.current_password.is_empty(),
        "current_password",
        "Current password is required",
    )
    .password(&request.new_password, "new_password");
    v.finish()?;

    let user = current_user(store, user_id).await?;
    let hash = user
        .password_hash
        .clone()
        .ok_or_else(|| AppError::not_found("No password is set for this account"))?;
    if !verify_blocking(request.current_password, hash).await? {
        warn!("Rejected password change for {}", user.id);
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let new_hash = hash_blocking(request.new_password).await?;
    store.update_password(user.id, &new_hash).await?;
    info!("Password changed for {}", user.id);
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceRequest {
    #[serde(alias = "preferenceId")]
    pub preference_id: String,
    pub enabled: bool,
}

/// Write one flag; the rest of the document is left as stored
async fn set_preference(
    store: &dyn Store,
    user_id: Uuid,
    group: PreferenceGroup,
    request: &PreferenceRequest,
) -> ApiResult<User> {
    let mut user = current_user(store, user_id).await?;
    if !user.set_preference(group, &request.preference_id, request.enabled) {
        return Err(AppError::bad_request(format!(
            "Invalid preference ID '{}'",
            request.preference_id
        )));
    }
    if !store
        .set_preference(user.id, group, &request.preference_id, request.enabled)
        .await?
    {
        return Err(AppError::Unauthenticated);
    }
    info!(
        "User {} set {} {}={}",
        user.id,
        group.column(),
        request.preference_id,
        request.enabled
    );
    current_user(store, user.id).await
}

pub async fn set_notification_preference(
    store: &dyn Store,
    user_id: Uuid,
    request: PreferenceRequest,
) -> ApiResult<NotificationPreferences> {
    let user = set_preference(store, user_id, PreferenceGroup::Notifications, &request).await?;
    Ok(user.notification_preferences)
}

pub async fn set_privacy_preference(
    store: &dyn Store,
    user_id: Uuid,
    request: PreferenceRequest,
) -> ApiResult<PrivacyPreferences> {
    let user = set_preference(store, user_id, PreferenceGroup::Privacy, &request).await?;
    Ok(user.privacy_preferences)
}

/// Remove the account and everything hanging off it
pub async fn delete_account(store: &dyn Store, user_id: Uuid) -> ApiResult<()> {
    let user = current_user(store, user_id).await?;
    store.delete_user(user.id).await?;
    info!("Deleted account {}", user.id);
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ExportedProfile {
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stats: UserStats,
}

#[derive(Debug, Serialize)]
pub struct ExportedPreferences {
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
}

#[derive(Debug, Serialize)]
pub struct ExportedContent {
    pub recipes: Vec<Recipe>,
    pub comments: Vec<Comment>,
    pub cookbooks: Vec<Cookbook>,
}

#[derive(Debug, Serialize)]
pub struct DataExport {
    pub profile: ExportedProfile,
    pub preferences: ExportedPreferences,
    pub content: ExportedContent,
}

pub async fn export_data(store: &dyn Store, user_id: Uuid) -> ApiResult<DataExport> {
    let user = current_user(store, user_id).await?;
    let query = RecipeQuery {
        author_id: Some(user.id),
        tag: None,
        viewer_id: Some(user.id),
        offset: 0,
        limit: i64::MAX,
    };
    let (recipes, _) = store.list_recipes(&query).await?;
    let comments = store.list_comments_by_author(user.id).await?;
    let cookbooks = store.list_cookbooks(user.id).await?;
    info!("Exported data for {}", user.id);

    Ok(DataExport {
        profile: ExportedProfile {
            name: user.name.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            image: user.image.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at,
            stats: user.stats(recipes.len() as i64),
        },
        preferences: ExportedPreferences {
            notifications: user.notification_preferences,
            privacy: user.privacy_preferences,
        },
        content: ExportedContent {
            recipes,
            comments,
            cookbooks,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sessions() -> SessionKeys {
        SessionKeys::new("test-secret", 1)
    }

    async fn registered(store: &MemoryStore) -> AuthResponse {
        register(
            store,
            &sessions(),
            RegisterRequest {
                name: "Ana".into(),
                email: " Ana@Example.com ".into(),
                password: "Sup3r$ecret".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn register_then_login() {
        let store = MemoryStore::new();
        let account = registered(&store).await;
        assert_eq!(account.user.email.as_deref(), Some("ana@example.com"));

        let ok = login(
            &store,
            &sessions(),
            LoginRequest { email: "ANA@example.com".into(), password: "Sup3r$ecret".into() },
        )
        .await
        .unwrap();
        assert_eq!(sessions().verify(&ok.token), Some(account.user.id));

        let err = login(
            &store,
            &sessions(),
            LoginRequest { email: "ana@example.com".into(), password: "nope".into() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn change_password_checks_current_password() {
        let store = MemoryStore::new();
        let id = registered(&store).await.user.id;

        let err = change_password(
            &store,
            id,
            ChangePasswordRequest {
                current_password: "Wr0ng$pass".into(),
                new_password: "N3w$ecret".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Current password is incorrect");

        change_password(
            &store,
            id,
            ChangePasswordRequest {
                current_password: "Sup3r$ecret".into(),
                new_password: "N3w$ecret".into(),
            },
        )
        .await
        .unwrap();
        let user = store.get_user(id).await.unwrap().unwrap();
        assert!(verify_password("N3w$ecret", user.password_hash.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn accounts_without_password_get_not_found() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser { name: "Oauth".into(), email: "o@example.com".into(), password_hash: None })
            .await
            .unwrap();
        let err = change_password(
            &store,
            user.id,
            ChangePasswordRequest {
                current_password: "whatever".into(),
                new_password: "N3w$ecret".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_preference_is_rejected() {
        let store = MemoryStore::new();
        let id = registered(&store).await.user.id;

        let prefs = set_notification_preference(
            &store,
            id,
            PreferenceRequest { preference_id: "recipe_likes".into(), enabled: true },
        )
        .await
        .unwrap();
        assert!(prefs.recipe_likes);

        let err = set_privacy_preference(
            &store,
            id,
            PreferenceRequest { preference_id: "telepathy".into(), enabled: true },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn preference_changes_touch_only_their_flag() {
        let store = MemoryStore::new();
        let id = registered(&store).await.user.id;

        let privacy = set_privacy_preference(
            &store,
            id,
            PreferenceRequest { preference_id: "show_email".into(), enabled: true },
        )
        .await
        .unwrap();
        assert!(privacy.show_email);

        let notifications = set_notification_preference(
            &store,
            id,
            PreferenceRequest { preference_id: "newsletter".into(), enabled: false },
        )
        .await
        .unwrap();
        assert!(!notifications.newsletter);

        let stored = store.get_user(id).await.unwrap().unwrap();
        assert!(stored.privacy_preferences.show_email);
        assert!(!stored.notification_preferences.newsletter);
        assert!(stored.privacy_preferences.profile_visibility);
    }
}
