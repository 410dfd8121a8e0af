// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Message;
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::models::RecipeDraft;
use crate::services::recipes::{self, RecipeList, RecipeView};
use crate::services::Page;

#[derive(Debug, Default, Deserialize)]
pub struct RecipesQuery {
    pub author: Option<Uuid>,
    pub tag: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LikesResponse {
    pub likes_count: usize,
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipesQuery>,
    session: Option<AuthSession>,
) -> ApiResult<Json<RecipeList>> {
    debug!("Listing recipes: {:?}", query);
    let page = Page::new(query.page, query.limit);
    let tag = query.tag.filter(|t| !t.trim().is_empty()).map(|t| t.trim().to_lowercase());
    let list = recipes::list_recipes(
        state.store.as_ref(),
        query.author,
        tag,
        page,
        session.map(|s| s.user_id),
    )
    .await?;
    Ok(Json(list))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Json(draft): Json<RecipeDraft>,
) -> ApiResult<(StatusCode, Json<RecipeView>)> {
    debug!("User {} creating recipe '{}'", session.user_id, draft.title);
    let recipe = recipes::create_recipe(state.store.as_ref(), session.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    session: Option<AuthSession>,
) -> ApiResult<Json<RecipeView>> {
    let recipe =
        recipes::get_recipe(state.store.as_ref(), recipe_id, session.map(|s| s.user_id)).await?;
    Ok(Json(recipe))
}

pub async fn get_recipe_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    session: Option<AuthSession>,
) -> ApiResult<Json<RecipeView>> {
    let recipe =
        recipes::get_recipe_by_slug(state.store.as_ref(), &slug, session.map(|s| s.user_id)).await?;
    Ok(Json(recipe))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path(recipe_id): Path<Uuid>,
    Json(draft): Json<RecipeDraft>,
) -> ApiResult<Json<RecipeView>> {
    debug!("User {} updating recipe {}", session.user_id, recipe_id);
    let recipe =
        recipes::update_recipe(state.store.as_ref(), session.user_id, recipe_id, draft).await?;
    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path(recipe_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    recipes::delete_recipe(state.store.as_ref(), session.user_id, recipe_id).await?;
    Ok(Json(Message::new("Recipe deleted successfully")))
}

pub async fn like_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path(recipe_id): Path<Uuid>,
) -> ApiResult<Json<LikesResponse>> {
    let likes_count = recipes::like_recipe(state.store.as_ref(), session.user_id, recipe_id).await?;
    Ok(Json(LikesResponse { likes_count }))
}

pub async fn unlike_recipe(
    State(state): State<AppState>,
    session: AuthSession,
    Path(recipe_id): Path<Uuid>,
) -> ApiResult<Json<LikesResponse>> {
    let likes_count =
        recipes::unlike_recipe(state.store.as_ref(), session.user_id, recipe_id).await?;
    Ok(Json(LikesResponse { likes_count }))
}
