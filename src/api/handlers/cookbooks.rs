// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::Message;
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::{ApiResult, AppError};
use crate::models::{Cookbook, CookbookDraft};
use crate::services::cookbooks::{self, CollaboratorRef, CookbookView, RecipeRef};

#[derive(Debug, Default, Deserialize)]
pub struct CookbooksQuery {
    pub owner: Option<Uuid>,
}

/// Cookbooks of `owner`, or the caller's own without it
pub async fn list_cookbooks(
    State(state): State<AppState>,
    Query(query): Query<CookbooksQuery>,
    session: Option<AuthSession>,
) -> ApiResult<Json<Vec<Cookbook>>> {
    let viewer = session.map(|s| s.user_id);
    let owner = query.owner.or(viewer).ok_or(AppError::Unauthenticated)?;
    debug!("Listing cookbooks of {} for {:?}", owner, viewer);
    Ok(Json(cookbooks::list_cookbooks(state.store.as_ref(), owner, viewer).await?))
}

pub async fn create_cookbook(
    State(state): State<AppState>,
    session: AuthSession,
    Json(draft): Json<CookbookDraft>,
) -> ApiResult<(StatusCode, Json<CookbookView>)> {
    let cookbook = cookbooks::create_cookbook(state.store.as_ref(), session.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(cookbook)))
}

pub async fn get_cookbook(
    State(state): State<AppState>,
    Path(cookbook_id): Path<Uuid>,
    session: Option<AuthSession>,
) -> ApiResult<Json<CookbookView>> {
    let cookbook =
        cookbooks::get_cookbook(state.store.as_ref(), cookbook_id, session.map(|s| s.user_id))
            .await?;
    Ok(Json(cookbook))
}

pub async fn update_cookbook(
    State(state): State<AppState>,
    session: AuthSession,
    Path(cookbook_id): Path<Uuid>,
    Json(draft): Json<CookbookDraft>,
) -> ApiResult<Json<CookbookView>> {
    let cookbook =
        cookbooks::update_cookbook(state.store.as_ref(), session.user_id, cookbook_id, draft)
            .await?;
    Ok(Json(cookbook))
}

pub async fn delete_cookbook(
    State(state): State<AppState>,
    session: AuthSession,
    Path(cookbook_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    cookbooks::delete_cookbook(state.store.as_ref(), session.user_id, cookbook_id).await?;
    Ok(Json(Message::new("Cookbook deleted successfully")))
}

pub async fn add_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path(cookbook_id): Path<Uuid>,
    Json(body): Json<RecipeRef>,
) -> ApiResult<Json<CookbookView>> {
    debug!("Adding {} to cookbook {}", body.recipe_id, cookbook_id);
    let cookbook = cookbooks::add_recipe(
        state.store.as_ref(),
        session.user_id,
        cookbook_id,
        body.recipe_id,
    )
    .await?;
    Ok(Json(cookbook))
}

pub async fn remove_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path((cookbook_id, recipe_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CookbookView>> {
    let cookbook =
        cookbooks::remove_recipe(state.store.as_ref(), session.user_id, cookbook_id, recipe_id)
            .await?;
    Ok(Json(cookbook))
}

pub async fn add_collaborator(
    State(state): State<AppState>,
    session: AuthSession,
    Path(cookbook_id): Path<Uuid>,
    Json(body): Json<CollaboratorRef>,
) -> ApiResult<Json<CookbookView>> {
    let cookbook = cookbooks::add_collaborator(
        state.store.as_ref(),
        session.user_id,
        cookbook_id,
        body.user_id,
    )
    .await?;
    Ok(Json(cookbook))
}

pub async fn remove_collaborator(
    State(state): State<AppState>,
    session: AuthSession,
    Path((cookbook_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CookbookView>> {
    let cookbook =
        cookbooks::remove_collaborator(state.store.as_ref(), session.user_id, cookbook_id, user_id)
            .await?;
    Ok(Json(cookbook))
}
