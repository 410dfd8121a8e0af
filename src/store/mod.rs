// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Persistence boundary.
//!
//! Handlers and services only talk to [`Store`]; `PgStore` backs production and
//! `MemoryStore` backs tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Activity, ActivityQuery, Comment, Cookbook, GroceryItem, Meal, MealPlan, MealTime, NewUser,
    Notification, PreferenceGroup, ProfileChanges, Recipe, RecipeQuery, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Every persistence operation the API performs.
///
/// Relationship and like mutations are set-style: adding an id that is already
/// present (or removing one that is absent) is a no-op reported as `false`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity check used by `/health`
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Users for `ids`, in the order of `ids`; unknown ids are skipped
    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Option<User>>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;
    /// Set one flag inside one preference document, leaving the others untouched
    async fn set_preference(
        &self,
        id: Uuid,
        group: PreferenceGroup,
        key: &str,
        enabled: bool,
    ) -> StoreResult<bool>;
    /// Delete the user and everything it owns, pulling its id out of every
    /// other document that references it
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // Relationships

    async fn add_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;
    async fn remove_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool>;
    /// Block `target` and drop follow edges in both directions
    async fn add_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool>;
    async fn remove_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool>;

    // Recipes

    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()>;
    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>>;
    async fn get_recipe_by_slug(&self, slug: &str) -> StoreResult<Option<Recipe>>;
    async fn get_recipes(&self, ids: &[Uuid]) -> StoreResult<Vec<Recipe>>;
    /// Newest first, with the total number of matches
    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<(Vec<Recipe>, i64)>;
    async fn count_recipes_by_author(&self, author_id: Uuid) -> StoreResult<i64>;
    async fn update_recipe(&self, recipe: &Recipe) -> StoreResult<bool>;
    /// Delete the recipe with its comments and pull it out of cookbooks
    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool>;
    async fn add_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn remove_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Comments

    /// Insert the comment and append it to its recipe's comment list
    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()>;
    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn get_comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>>;
    /// Oldest first
    async fn list_comments_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Comment>>;
    async fn list_comments_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Comment>>;
    /// Delete the comment and its replies
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Cookbooks

    async fn insert_cookbook(&self, cookbook: &Cookbook) -> StoreResult<()>;
    async fn get_cookbook(&self, id: Uuid) -> StoreResult<Option<Cookbook>>;
    async fn get_cookbooks(&self, ids: &[Uuid]) -> StoreResult<Vec<Cookbook>>;
    /// Cookbooks owned by `owner_id`, newest first
    async fn list_cookbooks(&self, owner_id: Uuid) -> StoreResult<Vec<Cookbook>>;
    /// Save title, description, cover, visibility and tags. Recipe and
    /// collaborator lists only change through the set operations below.
    async fn update_cookbook(&self, cookbook: &Cookbook) -> StoreResult<bool>;
    async fn delete_cookbook(&self, id: Uuid) -> StoreResult<bool>;
    async fn add_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool>;
    async fn remove_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool>;
    async fn add_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn remove_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Meal plans

    async fn insert_meal_plan(&self, plan: &MealPlan) -> StoreResult<()>;
    async fn get_meal_plan(&self, id: Uuid) -> StoreResult<Option<MealPlan>>;
    /// Plans owned by or shared with `user_id`, by start date
    async fn list_meal_plans(&self, user_id: Uuid) -> StoreResult<Vec<MealPlan>>;
    async fn delete_meal_plan(&self, id: Uuid) -> StoreResult<bool>;
    /// Append a meal to one day of the plan; `None` when the plan is gone
    async fn add_meal(
        &self,
        plan_id: Uuid,
        date: NaiveDate,
        time: MealTime,
        meal: Meal,
    ) -> StoreResult<Option<MealPlan>>;
    async fn add_grocery_item(&self, plan_id: Uuid, item: GroceryItem) -> StoreResult<Option<MealPlan>>;
    /// Flip one item's checked flag; `None` when the plan or the item is missing
    async fn toggle_grocery_item(&self, plan_id: Uuid, index: usize) -> StoreResult<Option<MealPlan>>;

    // Activities

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()>;
    /// Newest first, with the total number of matches
    async fn list_activities(&self, query: &ActivityQuery) -> StoreResult<(Vec<Activity>, i64)>;

    // Notifications

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
    /// Newest first
    async fn list_notifications(&self, recipient_id: Uuid) -> StoreResult<Vec<Notification>>;
    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64>;
    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64>;
    async fn mark_notifications_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64>;
    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> StoreResult<bool>;
    async fn delete_all_notifications(&self, recipient_id: Uuid) -> StoreResult<u64>;
}
