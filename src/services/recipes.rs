// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::views::UserSummary;
use super::{activity, current_user, notifications, Page, Pagination};
use crate::error::{ApiResult, AppError};
use crate::models::recipe::slugify;
use crate::models::{
    Activity, ActivityType, Comment, CommentDraft, NewNotification, NotificationType, Recipe,
    RecipeDraft, RecipeQuery, User,
};
use crate::store::Store;

/// Slug for `title` that no other recipe uses; `-2`, `-3`, ... on collision
pub async fn unique_slug(store: &dyn Store, title: &str, recipe_id: Option<Uuid>) -> ApiResult<String> {
    let base = match slugify(title).trim_matches('-') {
        "" => "recipe".to_string(),
        slug => slug.to_string(),
    };
    let mut candidate = base.clone();
    let mut n = 2;
    loop {
        match store.get_recipe_by_slug(&candidate).await? {
            Some(existing) if Some(existing.id) != recipe_id => {
                candidate = format!("{}-{}", base, n);
                n += 1;
            }
            _ => return Ok(candidate),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author: Option<UserSummary>,
    pub likes_count: usize,
    pub comments_count: usize,
    pub is_liked: bool,
}

impl RecipeView {
    fn new(recipe: Recipe, author: Option<&User>, viewer_id: Option<Uuid>) -> Self {
        Self {
            likes_count: recipe.likes_count(),
            comments_count: recipe.comments_count(),
            is_liked: viewer_id.map_or(false, |v| recipe.is_liked_by(v)),
            author: author.map(UserSummary::from),
            recipe,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeList {
    pub recipes: Vec<RecipeView>,
    pub pagination: Pagination,
}

async fn load(store: &dyn Store, recipe_id: Uuid) -> ApiResult<Recipe> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))
}

/// The recipe's author, or 403 when the author hides recipes from `viewer_id`
async fn ensure_visible(store: &dyn Store, recipe: &Recipe, viewer_id: Option<Uuid>) -> ApiResult<Option<User>> {
    let author = store.get_user(recipe.author_id).await?;
    if author.as_ref().map_or(false, |a| !a.recipes_visible_to(viewer_id)) {
        return Err(AppError::forbidden("This recipe is private"));
    }
    Ok(author)
}

async fn load_visible(store: &dyn Store, recipe_id: Uuid, viewer_id: Option<Uuid>) -> ApiResult<Recipe> {
    let recipe = load(store, recipe_id).await?;
    ensure_visible(store, &recipe, viewer_id).await?;
    Ok(recipe)
}

async fn view(store: &dyn Store, recipe: Recipe, viewer_id: Option<Uuid>) -> ApiResult<RecipeView> {
    let author = ensure_visible(store, &recipe, viewer_id).await?;
    Ok(RecipeView::new(recipe, author.as_ref(), viewer_id))
}

pub async fn create_recipe(store: &dyn Store, author_id: Uuid, draft: RecipeDraft) -> ApiResult<RecipeView> {
    draft.validate()?;
    let author = current_user(store, author_id).await?;
    let slug = unique_slug(store, &draft.title, None).await?;
    let recipe = Recipe::from_draft(draft, slug, author.id, Utc::now());
    store.insert_recipe(&recipe).await?;
    info!("User {} created recipe {} ({})", author.id, recipe.id, recipe.slug);

    activity::record(
        store,
        Activity::new(author.id, ActivityType::RecipeCreate, recipe.created_at).with_recipe(recipe.id),
    )
    .await;
    Ok(RecipeView::new(recipe, Some(&author), Some(author.id)))
}

pub async fn get_recipe(store: &dyn Store, recipe_id: Uuid, viewer_id: Option<Uuid>) -> ApiResult<RecipeView> {
    let recipe = load(store, recipe_id).await?;
    view(store, recipe, viewer_id).await
}

pub async fn get_recipe_by_slug(store: &dyn Store, slug: &str, viewer_id: Option<Uuid>) -> ApiResult<RecipeView> {
    let recipe = store
        .get_recipe_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    view(store, recipe, viewer_id).await
}

pub async fn list_recipes(
    store: &dyn Store,
    author_id: Option<Uuid>,
    tag: Option<String>,
    page: Page,
    viewer_id: Option<Uuid>,
) -> ApiResult<RecipeList> {
    let query = RecipeQuery {
        author_id,
        tag,
        viewer_id,
        offset: page.offset(),
        limit: page.limit,
    };
    debug!("Listing recipes {:?}", query);
    let (recipes, total) = store.list_recipes(&query).await?;

    let mut author_ids: Vec<Uuid> = recipes.iter().map(|r| r.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<Uuid, User> = store
        .get_users(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let views = recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id);
            RecipeView::new(recipe, author, viewer_id)
        })
        .collect();

    Ok(RecipeList {
        recipes: views,
        pagination: page.pagination(total),
    })
}

fn ensure_author(recipe: &Recipe, user_id: Uuid) -> ApiResult<()> {
    if recipe.author_id != user_id {
        return Err(AppError::forbidden("Only the author can modify this recipe"));
    }
    Ok(())
}

pub async fn update_recipe(
    store: &dyn Store,
    user_id: Uuid,
    recipe_id: Uuid,
    draft: RecipeDraft,
) -> ApiResult<RecipeView> {
    draft.validate()?;
    let user = current_user(store, user_id).await?;
    let mut recipe = load(store, recipe_id).await?;
    ensure_author(&recipe, user.id)?;

    if draft.title.trim() != recipe.title {
        recipe.slug = unique_slug(store, &draft.title, Some(recipe.id)).await?;
    }
    recipe.replace_with(draft, Utc::now());
    if !store.update_recipe(&recipe).await? {
        return Err(AppError::not_found("Recipe not found"));
    }
    info!("User {} updated recipe {}", user.id, recipe.id);
    Ok(RecipeView::new(recipe, Some(&user), Some(user.id)))
}

pub async fn delete_recipe(store: &dyn Store, user_id: Uuid, recipe_id: Uuid) -> ApiResult<()> {
    let recipe = load(store, recipe_id).await?;
    ensure_author(&recipe, user_id)?;
    store.delete_recipe(recipe.id).await?;
    info!("User {} deleted recipe {}", user_id, recipe.id);
    Ok(())
}

pub async fn like_recipe(store: &dyn Store, user_id: Uuid, recipe_id: Uuid) -> ApiResult<usize> {
    let user = current_user(store, user_id).await?;
    let recipe = load_visible(store, recipe_id, Some(user.id)).await?;
    if recipe.is_liked_by(user.id) || !store.add_recipe_like(recipe.id, user.id).await? {
        return Err(AppError::bad_request("Recipe already liked"));
    }
    debug!("User {} liked recipe {}", user.id, recipe.id);

    activity::record(
        store,
        Activity::new(user.id, ActivityType::RecipeLike, Utc::now()).with_recipe(recipe.id),
    )
    .await;
    notifications::notify(
        store,
        NewNotification::new(recipe.author_id, user.id, NotificationType::Like).recipe(recipe.id),
    )
    .await;
    Ok(recipe.likes_count() + 1)
}

pub async fn unlike_recipe(store: &dyn Store, user_id: Uuid, recipe_id: Uuid) -> ApiResult<usize> {
    let recipe = load(store, recipe_id).await?;
    if !store.remove_recipe_like(recipe.id, user_id).await? {
        return Err(AppError::bad_request("Recipe not liked"));
    }
    debug!("User {} unliked recipe {}", user_id, recipe.id);
    Ok(recipe.likes_count().saturating_sub(1))
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<UserSummary>,
    pub likes_count: usize,
    pub is_liked: bool,
}

/// All comments on a recipe, oldest first
pub async fn list_comments(
    store: &dyn Store,
    recipe_id: Uuid,
    viewer_id: Option<Uuid>,
) -> ApiResult<Vec<CommentView>> {
    let recipe = load_visible(store, recipe_id, viewer_id).await?;
    let comments = store.list_comments_for_recipe(recipe.id).await?;

    let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
    author_ids.sort();
    author_ids.dedup();
    let authors: HashMap<Uuid, UserSummary> = store
        .get_users(&author_ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            author: authors.get(&comment.author_id).cloned(),
            likes_count: comment.likes.len(),
            is_liked: viewer_id.map_or(false, |v| comment.is_liked_by(v)),
            comment,
        })
        .collect())
}

pub async fn add_comment(
    store: &dyn Store,
    author_id: Uuid,
    recipe_id: Uuid,
    draft: CommentDraft,
) -> ApiResult<CommentView> {
    draft.validate()?;
    let author = current_user(store, author_id).await?;
    let recipe = load_visible(store, recipe_id, Some(author.id)).await?;

    let parent = match draft.parent_id {
        Some(parent_id) => {
            let parent = store
                .get_comment(parent_id)
                .await?
                .filter(|p| p.recipe_id == recipe.id)
                .ok_or_else(|| AppError::bad_request("Parent comment does not belong to this recipe"))?;
            Some(parent)
        }
        None => None,
    };

    let mut mentions = draft.mentions.clone();
    mentions.sort();
    mentions.dedup();
    mentions.retain(|id| *id != author.id);

    let comment = Comment::new(draft, author.id, recipe.id, Utc::now());
    store.insert_comment(&comment).await?;
    info!("User {} commented {} on recipe {}", author.id, comment.id, recipe.id);

    activity::record(
        store,
        Activity::new(author.id, ActivityType::RecipeComment, comment.created_at)
            .with_recipe(recipe.id)
            .with_comment(comment.id),
    )
    .await;
    notifications::notify(
        store,
        NewNotification::new(recipe.author_id, author.id, NotificationType::Comment)
            .recipe(recipe.id)
            .comment(comment.id),
    )
    .await;
    if let Some(parent) = parent.filter(|p| p.author_id != recipe.author_id) {
        notifications::notify(
            store,
            NewNotification::new(parent.author_id, author.id, NotificationType::Comment)
                .recipe(recipe.id)
                .comment(comment.id),
        )
        .await;
    }

    let mentioned = store.get_users(&mentions).await?;
    let (comment_id, at) = (comment.id, comment.created_at);
    join_all(mentioned.iter().map(|user| async move {
        activity::record(
            store,
            Activity::new(author_id, ActivityType::UserMention, at)
                .with_target_user(user.id)
                .with_recipe(recipe_id)
                .with_comment(comment_id),
        )
        .await;
        notifications::notify(
            store,
            NewNotification::new(user.id, author_id, NotificationType::Mention)
                .recipe(recipe_id)
                .comment(comment_id),
        )
        .await;
    }))
    .await;

    Ok(CommentView {
        author: Some(UserSummary::from(&author)),
        likes_count: 0,
        is_liked: false,
        comment,
    })
}

/// Comment author or recipe author may delete; replies go with it
pub async fn delete_comment(store: &dyn Store, user_id: Uuid, comment_id: Uuid) -> ApiResult<()> {
    let comment = store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    let recipe_author = store.get_recipe(comment.recipe_id).await?.map(|r| r.author_id);
    if comment.author_id != user_id && recipe_author != Some(user_id) {
        return Err(AppError::forbidden("Not allowed to delete this comment"));
    }
    store.delete_comment(comment.id).await?;
    info!("User {} deleted comment {}", user_id, comment.id);
    Ok(())
}

pub async fn like_comment(store: &dyn Store, user_id: Uuid, comment_id: Uuid) -> ApiResult<()> {
    let comment = store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    load_visible(store, comment.recipe_id, Some(user_id)).await?;
    if !store.add_comment_like(comment.id, user_id).await? {
        return Err(AppError::bad_request("Comment already liked"));
    }
    Ok(())
}

pub async fn unlike_comment(store: &dyn Store, user_id: Uuid, comment_id: Uuid) -> ApiResult<()> {
    let comment = store
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))?;
    if !store.remove_comment_like(comment.id, user_id).await? {
        return Err(AppError::bad_request("Comment not liked"));
    }
    Ok(())
}
