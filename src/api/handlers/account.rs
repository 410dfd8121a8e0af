// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::State;
use axum::Json;
use tracing::debug;

use super::Message;
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::models::{NotificationPreferences, PrivacyPreferences};
use crate::services::account::{self, ChangePasswordRequest, DataExport, PreferenceRequest};
use crate::services::profile::{self, UpdateProfileRequest, UserProfile};

pub async fn get_account(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(profile::own_profile(state.store.as_ref(), session.user_id).await?))
}

pub async fn update_account(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    debug!("Updating profile of {}", session.user_id);
    let updated = profile::update_profile(state.store.as_ref(), session.user_id, request).await?;
    Ok(Json(updated))
}

pub async fn delete_account(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Message>> {
    debug!("Deleting account {}", session.user_id);
    account::delete_account(state.store.as_ref(), session.user_id).await?;
    Ok(Json(Message::new("Account deleted successfully")))
}

pub async fn change_password(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Message>> {
    debug!("Password change for {}", session.user_id);
    account::change_password(state.store.as_ref(), session.user_id, request).await?;
    Ok(Json(Message::new("Password updated successfully")))
}

pub async fn set_notification_preference(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<PreferenceRequest>,
) -> ApiResult<Json<NotificationPreferences>> {
    let prefs =
        account::set_notification_preference(state.store.as_ref(), session.user_id, request).await?;
    Ok(Json(prefs))
}

pub async fn set_privacy_preference(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<PreferenceRequest>,
) -> ApiResult<Json<PrivacyPreferences>> {
    let prefs =
        account::set_privacy_preference(state.store.as_ref(), session.user_id, request).await?;
    Ok(Json(prefs))
}

pub async fn export_data(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<DataExport>> {
    debug!("Data export for {}", session.user_id);
    Ok(Json(account::export_data(state.store.as_ref(), session.user_id).await?))
}
