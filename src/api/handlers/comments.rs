// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use super::Message;
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::models::CommentDraft;
use crate::services::recipes::{self, CommentView};

pub async fn list_comments(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    session: Option<AuthSession>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let comments =
        recipes::list_comments(state.store.as_ref(), recipe_id, session.map(|s| s.user_id)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    session: AuthSession,
    Path(recipe_id): Path<Uuid>,
    Json(draft): Json<CommentDraft>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    debug!("User {} commenting on {}", session.user_id, recipe_id);
    let comment = recipes::add_comment(state.store.as_ref(), session.user_id, recipe_id, draft).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    session: AuthSession,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    recipes::delete_comment(state.store.as_ref(), session.user_id, comment_id).await?;
    Ok(Json(Message::new("Comment deleted successfully")))
}

pub async fn like_comment(
    State(state): State<AppState>,
    session: AuthSession,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    recipes::like_comment(state.store.as_ref(), session.user_id, comment_id).await?;
    Ok(Json(Message::new("Comment liked")))
}

pub async fn unlike_comment(
    State(state): State<AppState>,
    session: AuthSession,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    recipes::unlike_comment(state.store.as_ref(), session.user_id, comment_id).await?;
    Ok(Json(Message::new("Comment unliked")))
}
