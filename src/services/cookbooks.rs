// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::views::{RecipeSummary, UserSummary};
use super::{activity, current_user, notifications, require_user};
use crate::error::{ApiResult, AppError};
use crate::models::{
    Activity, ActivityType, Cookbook, CookbookDraft, NewNotification, NotificationType,
};
use crate::store::Store;

/// A cookbook with its owner and recipes resolved
#[derive(Debug, Serialize)]
pub struct CookbookView {
    #[serde(flatten)]
    pub cookbook: Cookbook,
    pub owner: Option<UserSummary>,
    pub recipe_details: Vec<RecipeSummary>,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeRef {
    #[serde(alias = "recipeId")]
    pub recipe_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorRef {
    #[serde(alias = "userId")]
    pub user_id: Uuid,
}

async fn load(store: &dyn Store, cookbook_id: Uuid) -> ApiResult<Cookbook> {
    store
        .get_cookbook(cookbook_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cookbook not found"))
}

/// Private cookbooks look missing to outsiders
async fn load_visible(store: &dyn Store, cookbook_id: Uuid, viewer_id: Option<Uuid>) -> ApiResult<Cookbook> {
    let cookbook = load(store, cookbook_id).await?;
    if !cookbook.has_access(viewer_id) {
        return Err(AppError::not_found("Cookbook not found"));
    }
    Ok(cookbook)
}

async fn load_editable(store: &dyn Store, cookbook_id: Uuid, user_id: Uuid) -> ApiResult<Cookbook> {
    let cookbook = load_visible(store, cookbook_id, Some(user_id)).await?;
    if !cookbook.can_edit(user_id) {
        return Err(AppError::forbidden("Not allowed to edit this cookbook"));
    }
    Ok(cookbook)
}

async fn load_owned(store: &dyn Store, cookbook_id: Uuid, user_id: Uuid) -> ApiResult<Cookbook> {
    let cookbook = load_visible(store, cookbook_id, Some(user_id)).await?;
    if cookbook.owner_id != user_id {
        return Err(AppError::forbidden("Only the owner can do this"));
    }
    Ok(cookbook)
}

async fn view(store: &dyn Store, cookbook: Cookbook, viewer_id: Option<Uuid>) -> ApiResult<CookbookView> {
    let owner = store.get_user(cookbook.owner_id).await?;
    let recipes = store.get_recipes(&cookbook.recipes).await?;
    Ok(CookbookView {
        owner: owner.as_ref().map(UserSummary::from),
        recipe_details: recipes.iter().map(RecipeSummary::from).collect(),
        can_edit: viewer_id.map_or(false, |id| cookbook.can_edit(id)),
        cookbook,
    })
}

pub async fn create_cookbook(store: &dyn Store, owner_id: Uuid, draft: CookbookDraft) -> ApiResult<CookbookView> {
    draft.validate()?;
    let owner = current_user(store, owner_id).await?;
    let cookbook = Cookbook::from_draft(draft, owner.id, Utc::now());
    store.insert_cookbook(&cookbook).await?;
    info!("User {} created cookbook {}", owner.id, cookbook.id);

    activity::record(
        store,
        Activity::new(owner.id, ActivityType::CookbookCreate, cookbook.created_at)
            .with_cookbook(cookbook.id),
    )
    .await;
    view(store, cookbook, Some(owner.id)).await
}

pub async fn get_cookbook(store: &dyn Store, cookbook_id: Uuid, viewer_id: Option<Uuid>) -> ApiResult<CookbookView> {
    let cookbook = load_visible(store, cookbook_id, viewer_id).await?;
    view(store, cookbook, viewer_id).await
}

/// Cookbooks owned by `owner_id` that the viewer may see
pub async fn list_cookbooks(store: &dyn Store, owner_id: Uuid, viewer_id: Option<Uuid>) -> ApiResult<Vec<Cookbook>> {
    let owner = require_user(store, owner_id).await?;
    Ok(store
        .list_cookbooks(owner.id)
        .await?
        .into_iter()
        .filter(|c| c.has_access(viewer_id))
        .collect())
}

pub async fn update_cookbook(
    store: &dyn Store,
    user_id: Uuid,
    cookbook_id: Uuid,
    draft: CookbookDraft,
) -> ApiResult<CookbookView> {
    draft.validate()?;
    let mut cookbook = load_editable(store, cookbook_id, user_id).await?;
    cookbook.replace_with(draft, Utc::now());
    if !store.update_cookbook(&cookbook).await? {
        return Err(AppError::not_found("Cookbook not found"));
    }
    info!("User {} updated cookbook {}", user_id, cookbook.id);
    let cookbook = load(store, cookbook.id).await?;
    view(store, cookbook, Some(user_id)).await
}

pub async fn delete_cookbook(store: &dyn Store, user_id: Uuid, cookbook_id: Uuid) -> ApiResult<()> {
    let cookbook = load_owned(store, cookbook_id, user_id).await?;
    store.delete_cookbook(cookbook.id).await?;
    info!("User {} deleted cookbook {}", user_id, cookbook.id);
    Ok(())
}

/// Reload after a set change; a cookbook deleted in between is a 404, an unchanged set is `unchanged`
async fn settle(store: &dyn Store, cookbook_id: Uuid, changed: bool, unchanged: AppError) -> ApiResult<Cookbook> {
    let cookbook = load(store, cookbook_id).await?;
    if !changed {
        return Err(unchanged);
    }
    Ok(cookbook)
}

pub async fn add_recipe(store: &dyn Store, user_id: Uuid, cookbook_id: Uuid, recipe_id: Uuid) -> ApiResult<CookbookView> {
    let cookbook = load_editable(store, cookbook_id, user_id).await?;
    let recipe = store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    let added = store.add_cookbook_recipe(cookbook.id, recipe.id).await?;
    let cookbook = settle(store, cookbook.id, added, AppError::bad_request("Recipe already in cookbook")).await?;
    info!("User {} added recipe {} to cookbook {}", user_id, recipe.id, cookbook.id);

    activity::record(
        store,
        Activity::new(user_id, ActivityType::CookbookAddRecipe, cookbook.updated_at)
            .with_cookbook(cookbook.id)
            .with_recipe(recipe.id),
    )
    .await;
    notifications::notify(
        store,
        NewNotification::new(recipe.author_id, user_id, NotificationType::CookbookAdd)
            .recipe(recipe.id)
            .cookbook(cookbook.id),
    )
    .await;
    view(store, cookbook, Some(user_id)).await
}

pub async fn remove_recipe(store: &dyn Store, user_id: Uuid, cookbook_id: Uuid, recipe_id: Uuid) -> ApiResult<CookbookView> {
    let cookbook = load_editable(store, cookbook_id, user_id).await?;
    let removed = store.remove_cookbook_recipe(cookbook.id, recipe_id).await?;
    let cookbook = settle(store, cookbook.id, removed, AppError::not_found("Recipe is not in this cookbook")).await?;
    info!("User {} removed recipe {} from cookbook {}", user_id, recipe_id, cookbook.id);
    view(store, cookbook, Some(user_id)).await
}

pub async fn add_collaborator(
    store: &dyn Store,
    user_id: Uuid,
    cookbook_id: Uuid,
    collaborator_id: Uuid,
) -> ApiResult<CookbookView> {
    let cookbook = load_owned(store, cookbook_id, user_id).await?;
    let collaborator = require_user(store, collaborator_id).await?;
    if collaborator.id == cookbook.owner_id {
        return Err(AppError::bad_request("The owner cannot be a collaborator"));
    }
    let added = store.add_cookbook_collaborator(cookbook.id, collaborator.id).await?;
    let cookbook = settle(store, cookbook.id, added, AppError::bad_request("User is already a collaborator")).await?;
    info!("Cookbook {} shared with {}", cookbook.id, collaborator.id);
    view(store, cookbook, Some(user_id)).await
}

pub async fn remove_collaborator(
    store: &dyn Store,
    user_id: Uuid,
    cookbook_id: Uuid,
    collaborator_id: Uuid,
) -> ApiResult<CookbookView> {
    let cookbook = load_owned(store, cookbook_id, user_id).await?;
    let removed = store.remove_cookbook_collaborator(cookbook.id, collaborator_id).await?;
    let cookbook = settle(store, cookbook.id, removed, AppError::not_found("User is not a collaborator")).await?;
    info!("Cookbook {} no longer shared with {}", cookbook.id, collaborator_id);
    view(store, cookbook, Some(user_id)).await
}
