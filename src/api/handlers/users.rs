// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use super::{Message, PaginationParams};
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::services::profile::{self, Connection, ConnectionList, UserProfile};
use crate::services::relationships;

/// Get a user's public profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    session: Option<AuthSession>,
) -> ApiResult<Json<UserProfile>> {
    let viewer = session.map(|s| s.user_id);
    let profile = profile::get_user_profile(state.store.as_ref(), user_id, viewer).await?;
    Ok(Json(profile))
}

pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
    session: Option<AuthSession>,
) -> ApiResult<Json<ConnectionList>> {
    debug!("Getting followers of {}, page {:?}", user_id, params.page);
    let list = profile::list_connections(
        state.store.as_ref(),
        user_id,
        session.map(|s| s.user_id),
        Connection::Followers,
        params.page(),
    )
    .await?;
    Ok(Json(list))
}

pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
    session: Option<AuthSession>,
) -> ApiResult<Json<ConnectionList>> {
    debug!("Getting following of {}, page {:?}", user_id, params.page);
    let list = profile::list_connections(
        state.store.as_ref(),
        user_id,
        session.map(|s| s.user_id),
        Connection::Following,
        params.page(),
    )
    .await?;
    Ok(Json(list))
}

pub async fn follow(
    State(state): State<AppState>,
    session: AuthSession,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    debug!("Follow {} -> {}", session.user_id, target_id);
    relationships::follow(state.store.as_ref(), session.user_id, target_id).await?;
    Ok(Json(Message::new("Successfully followed user")))
}

pub async fn unfollow(
    State(state): State<AppState>,
    session: AuthSession,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    debug!("Unfollow {} -> {}", session.user_id, target_id);
    relationships::unfollow(state.store.as_ref(), session.user_id, target_id).await?;
    Ok(Json(Message::new("Successfully unfollowed user")))
}

pub async fn block(
    State(state): State<AppState>,
    session: AuthSession,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    debug!("Block {} -> {}", session.user_id, target_id);
    relationships::block(state.store.as_ref(), session.user_id, target_id).await?;
    Ok(Json(Message::new("User blocked successfully")))
}

pub async fn unblock(
    State(state): State<AppState>,
    session: AuthSession,
    Path(target_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    debug!("Unblock {} -> {}", session.user_id, target_id);
    relationships::unblock(state.store.as_ref(), session.user_id, target_id).await?;
    Ok(Json(Message::new("User unblocked successfully")))
}
