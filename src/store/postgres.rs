// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::sql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::{Database, DbConnection};
use crate::models::comment::thread_ids;
use crate::models::{
    Activity, ActivityQuery, ActivityScope, Comment, Cookbook, GroceryItem, Meal, MealPlan,
    MealTime, NewUser, Notification, PreferenceGroup, ProfileChanges, Recipe, RecipeQuery, User,
};
use crate::schema::{activities, comments, cookbooks, meal_plans, notifications, recipes, users};

// Rows mirror the tables column for column. Nested documents live in JSONB.

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: Option<String>,
    image: Option<String>,
    cover_image: Option<String>,
    bio: Option<String>,
    followers: Vec<Uuid>,
    following: Vec<Uuid>,
    blocked_users: Vec<Uuid>,
    notification_preferences: serde_json::Value,
    privacy_preferences: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct ProfileChangeset<'a> {
    name: Option<&'a str>,
    email: Option<&'a str>,
    bio: Option<&'a str>,
    image: Option<&'a str>,
    cover_image: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(Pg))]
struct RecipeRow {
    id: Uuid,
    title: String,
    slug: String,
    description: Option<String>,
    ingredients: serde_json::Value,
    steps: serde_json::Value,
    media: serde_json::Value,
    tags: Vec<String>,
    difficulty: String,
    prep_time: i32,
    cook_time: i32,
    servings: i32,
    author_id: Uuid,
    likes: Vec<Uuid>,
    comments: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Editable recipe content; likes and comments are only touched by targeted updates
#[derive(AsChangeset)]
#[diesel(table_name = recipes)]
#[diesel(treat_none_as_null = true)]
struct RecipeChangeset {
    title: String,
    slug: String,
    description: Option<String>,
    ingredients: serde_json::Value,
    steps: serde_json::Value,
    media: serde_json::Value,
    tags: Vec<String>,
    difficulty: String,
    prep_time: i32,
    cook_time: i32,
    servings: i32,
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(Pg))]
struct CommentRow {
    id: Uuid,
    content: String,
    author_id: Uuid,
    recipe_id: Uuid,
    parent_id: Option<Uuid>,
    likes: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = cookbooks)]
#[diesel(check_for_backend(Pg))]
struct CookbookRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    owner_id: Uuid,
    collaborators: Vec<Uuid>,
    recipes: Vec<Uuid>,
    cover_image: Option<String>,
    is_public: bool,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Cookbook details; the recipe and collaborator arrays have their own statements
#[derive(AsChangeset)]
#[diesel(table_name = cookbooks)]
#[diesel(treat_none_as_null = true)]
struct CookbookChangeset<'a> {
    title: &'a str,
    description: Option<&'a str>,
    cover_image: Option<&'a str>,
    is_public: bool,
    tags: &'a [String],
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = meal_plans)]
#[diesel(check_for_backend(Pg))]
struct MealPlanRow {
    id: Uuid,
    title: String,
    owner_id: Uuid,
    collaborators: Vec<Uuid>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: serde_json::Value,
    grocery_list: serde_json::Value,
    notes: Option<String>,
    is_template: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = activities)]
#[diesel(check_for_backend(Pg))]
struct ActivityRow {
    id: Uuid,
    actor_id: Uuid,
    activity_type: String,
    recipe_id: Option<Uuid>,
    cookbook_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    target_user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(Pg))]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    sender_id: Uuid,
    notification_type: String,
    read: bool,
    recipe_id: Option<Uuid>,
    comment_id: Option<Uuid>,
    cookbook_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            image: row.image,
            cover_image: row.cover_image,
            bio: row.bio,
            followers: row.followers,
            following: row.following,
            blocked_users: row.blocked_users,
            notification_preferences: serde_json::from_value(row.notification_preferences)?,
            privacy_preferences: serde_json::from_value(row.privacy_preferences)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<&User> for UserRow {
    type Error = StoreError;

    fn try_from(user: &User) -> StoreResult<Self> {
        Ok(UserRow {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            image: user.image.clone(),
            cover_image: user.cover_image.clone(),
            bio: user.bio.clone(),
            followers: user.followers.clone(),
            following: user.following.clone(),
            blocked_users: user.blocked_users.clone(),
            notification_preferences: serde_json::to_value(&user.notification_preferences)?,
            privacy_preferences: serde_json::to_value(&user.privacy_preferences)?,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = StoreError;

    fn try_from(row: RecipeRow) -> StoreResult<Self> {
        Ok(Recipe {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            ingredients: serde_json::from_value(row.ingredients)?,
            steps: serde_json::from_value(row.steps)?,
            media: serde_json::from_value(row.media)?,
            tags: row.tags,
            difficulty: row.difficulty.parse().map_err(StoreError::Decode)?,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            servings: row.servings,
            author_id: row.author_id,
            likes: row.likes,
            comments: row.comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<&Recipe> for RecipeRow {
    type Error = StoreError;

    fn try_from(recipe: &Recipe) -> StoreResult<Self> {
        Ok(RecipeRow {
            id: recipe.id,
            title: recipe.title.clone(),
            slug: recipe.slug.clone(),
            description: recipe.description.clone(),
            ingredients: serde_json::to_value(&recipe.ingredients)?,
            steps: serde_json::to_value(&recipe.steps)?,
            media: serde_json::to_value(&recipe.media)?,
            tags: recipe.tags.clone(),
            difficulty: recipe.difficulty.as_str().to_string(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            author_id: recipe.author_id,
            likes: recipe.likes.clone(),
            comments: recipe.comments.clone(),
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        })
    }
}

impl TryFrom<&Recipe> for RecipeChangeset {
    type Error = StoreError;

    fn try_from(recipe: &Recipe) -> StoreResult<Self> {
        let row = RecipeRow::try_from(recipe)?;
        Ok(RecipeChangeset {
            title: row.title,
            slug: row.slug,
            description: row.description,
            ingredients: row.ingredients,
            steps: row.steps,
            media: row.media,
            tags: row.tags,
            difficulty: row.difficulty,
            prep_time: row.prep_time,
            cook_time: row.cook_time,
            servings: row.servings,
            updated_at: row.updated_at,
        })
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            recipe_id: row.recipe_id,
            parent_id: row.parent_id,
            likes: row.likes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        CommentRow {
            id: comment.id,
            content: comment.content.clone(),
            author_id: comment.author_id,
            recipe_id: comment.recipe_id,
            parent_id: comment.parent_id,
            likes: comment.likes.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

impl From<CookbookRow> for Cookbook {
    fn from(row: CookbookRow) -> Self {
        Cookbook {
            id: row.id,
            title: row.title,
            description: row.description,
            owner_id: row.owner_id,
            collaborators: row.collaborators,
            recipes: row.recipes,
            cover_image: row.cover_image,
            is_public: row.is_public,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Cookbook> for CookbookRow {
    fn from(cookbook: &Cookbook) -> Self {
        CookbookRow {
            id: cookbook.id,
            title: cookbook.title.clone(),
            description: cookbook.description.clone(),
            owner_id: cookbook.owner_id,
            collaborators: cookbook.collaborators.clone(),
            recipes: cookbook.recipes.clone(),
            cover_image: cookbook.cover_image.clone(),
            is_public: cookbook.is_public,
            tags: cookbook.tags.clone(),
            created_at: cookbook.created_at,
            updated_at: cookbook.updated_at,
        }
    }
}

impl TryFrom<MealPlanRow> for MealPlan {
    type Error = StoreError;

    fn try_from(row: MealPlanRow) -> StoreResult<Self> {
        Ok(MealPlan {
            id: row.id,
            title: row.title,
            owner_id: row.owner_id,
            collaborators: row.collaborators,
            start_date: row.start_date,
            end_date: row.end_date,
            days: serde_json::from_value(row.days)?,
            grocery_list: serde_json::from_value(row.grocery_list)?,
            notes: row.notes,
            is_template: row.is_template,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<&MealPlan> for MealPlanRow {
    type Error = StoreError;

    fn try_from(plan: &MealPlan) -> StoreResult<Self> {
        Ok(MealPlanRow {
            id: plan.id,
            title: plan.title.clone(),
            owner_id: plan.owner_id,
            collaborators: plan.collaborators.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            days: serde_json::to_value(&plan.days)?,
            grocery_list: serde_json::to_value(&plan.grocery_list)?,
            notes: plan.notes.clone(),
            is_template: plan.is_template,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        })
    }
}

impl TryFrom<ActivityRow> for Activity {
    type Error = StoreError;

    fn try_from(row: ActivityRow) -> StoreResult<Self> {
        Ok(Activity {
            id: row.id,
            actor_id: row.actor_id,
            activity_type: row.activity_type.parse().map_err(StoreError::Decode)?,
            recipe_id: row.recipe_id,
            cookbook_id: row.cookbook_id,
            comment_id: row.comment_id,
            target_user_id: row.target_user_id,
            created_at: row.created_at,
        })
    }
}

impl From<&Activity> for ActivityRow {
    fn from(activity: &Activity) -> Self {
        ActivityRow {
            id: activity.id,
            actor_id: activity.actor_id,
            activity_type: activity.activity_type.as_str().to_string(),
            recipe_id: activity.recipe_id,
            cookbook_id: activity.cookbook_id,
            comment_id: activity.comment_id,
            target_user_id: activity.target_user_id,
            created_at: activity.created_at,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> StoreResult<Self> {
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            sender_id: row.sender_id,
            notification_type: row.notification_type.parse().map_err(StoreError::Decode)?,
            read: row.read,
            recipe_id: row.recipe_id,
            comment_id: row.comment_id,
            cookbook_id: row.cookbook_id,
            created_at: row.created_at,
        })
    }
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        NotificationRow {
            id: n.id,
            recipient_id: n.recipient_id,
            sender_id: n.sender_id,
            notification_type: n.notification_type.as_str().to_string(),
            read: n.read,
            recipe_id: n.recipe_id,
            comment_id: n.comment_id,
            cookbook_id: n.cookbook_id,
            created_at: n.created_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Reorder `items` to follow `ids`, dropping ids that were not found
fn in_order_of<T>(ids: &[Uuid], items: Vec<T>, key: impl Fn(&T) -> Uuid) -> Vec<T> {
    let mut by_id: HashMap<Uuid, T> = items.into_iter().map(|item| (key(&item), item)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

fn conflict_on_unique(message: impl Into<String>) -> impl FnOnce(DieselError) -> StoreError {
    move |e| match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Conflict(message.into())
        }
        other => StoreError::Database(other),
    }
}

/// Remove `ids` from the `comments` array of one recipe
const PULL_RECIPE_COMMENTS: &str = "UPDATE recipes
     SET comments = ARRAY(SELECT c FROM unnest(comments) AS c WHERE NOT (c = ANY($2)))
     WHERE id = $1";

/// Postgres-backed store
pub struct PgStore {
    db: Arc<Database>,
}

impl PgStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn conn(&self) -> StoreResult<DbConnection> {
        self.db
            .get_connection()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }

    /// Append `value` to a uuid array column unless already present.
    /// `touch` also bumps the row's `updated_at`.
    async fn array_add(
        &self,
        table: &str,
        column: &str,
        id: Uuid,
        value: Uuid,
        touch: bool,
    ) -> StoreResult<bool> {
        let stamp = if touch { ", updated_at = now()" } else { "" };
        let mut conn = self.conn().await?;
        let updated = diesel::sql_query(format!(
            "UPDATE {table} SET {column} = array_append({column}, $2){stamp}
             WHERE id = $1 AND NOT ($2 = ANY({column}))"
        ))
        .bind::<sql_types::Uuid, _>(id)
        .bind::<sql_types::Uuid, _>(value)
        .execute(&mut conn)
        .await?;
        Ok(updated > 0)
    }

    /// Remove `value` from a uuid array column
    async fn array_pull(
        &self,
        table: &str,
        column: &str,
        id: Uuid,
        value: Uuid,
        touch: bool,
    ) -> StoreResult<bool> {
        let stamp = if touch { ", updated_at = now()" } else { "" };
        let mut conn = self.conn().await?;
        let updated = diesel::sql_query(format!(
            "UPDATE {table} SET {column} = array_remove({column}, $2){stamp}
             WHERE id = $1 AND $2 = ANY({column})"
        ))
        .bind::<sql_types::Uuid, _>(id)
        .bind::<sql_types::Uuid, _>(value)
        .execute(&mut conn)
        .await?;
        Ok(updated > 0)
    }

    /// Apply `change` to a meal plan under a row lock and save its day and grocery lists
    async fn modify_meal_plan<F>(&self, id: Uuid, change: F) -> StoreResult<Option<MealPlan>>
    where
        F: FnOnce(&mut MealPlan) -> bool + Send + 'static,
    {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let row = meal_plans::table
                    .find(id)
                    .select(MealPlanRow::as_select())
                    .for_update()
                    .get_result(conn)
                    .await
                    .optional()?;
                let mut plan = match row {
                    Some(row) => MealPlan::try_from(row)?,
                    None => return Ok(None),
                };
                if !change(&mut plan) {
                    return Ok(None);
                }
                plan.updated_at = Utc::now();
                diesel::update(meal_plans::table.find(id))
                    .set((
                        meal_plans::days.eq(serde_json::to_value(&plan.days)?),
                        meal_plans::grocery_list.eq(serde_json::to_value(&plan.grocery_list)?),
                        meal_plans::updated_at.eq(plan.updated_at),
                    ))
                    .execute(conn)
                    .await?;
                Ok(Some(plan))
            }
            .scope_boxed()
        })
        .await
    }
}

fn activity_filter(query: &ActivityQuery) -> activities::BoxedQuery<'static, Pg> {
    let mut q = activities::table.into_boxed();
    q = match &query.scope {
        ActivityScope::Actor(actor) => q.filter(activities::actor_id.eq(*actor)),
        ActivityScope::Network { actors, target_user } => q.filter(
            activities::actor_id
                .eq_any(actors.clone())
                .or(activities::target_user_id.eq(*target_user)),
        ),
    };
    if let Some(types) = query.filter.types() {
        let names: Vec<&'static str> = types.iter().map(|t| t.as_str()).collect();
        q = q.filter(activities::activity_type.eq_any(names));
    }
    if !query.exclude_actors.is_empty() {
        q = q.filter(activities::actor_id.ne_all(query.exclude_actors.clone()));
    }
    q
}

fn recipe_filter(query: &RecipeQuery) -> recipes::BoxedQuery<'static, Pg> {
    let mut q = recipes::table.into_boxed();
    if let Some(author) = query.author_id {
        q = q.filter(recipes::author_id.eq(author));
    }
    if let Some(tag) = &query.tag {
        q = q.filter(recipes::tags.contains(vec![tag.to_lowercase()]));
    }
    // Authors hiding their recipes, except the viewer
    let hidden_authors = users::table
        .filter(sql::<sql_types::Bool>(
            "(privacy_preferences->>'recipe_visibility')::boolean IS FALSE",
        ))
        .filter(users::id.ne(query.viewer_id.unwrap_or_else(Uuid::nil)))
        .select(users::id);
    q.filter(recipes::author_id.ne_all(hidden_authors))
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = User::new(new_user, Utc::now());
        let row = UserRow::try_from(&user)?;
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(conflict_on_unique("Email already in use"))?;
        debug!("Inserted user {}", user.id);
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn().await?;
        users::table
            .filter(users::email.eq(email.to_lowercase()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let rows = users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await?;
        let found: Vec<User> = convert_all(rows)?;
        Ok(in_order_of(ids, found, |u| u.id))
    }

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Option<User>> {
        let changeset = ProfileChangeset {
            name: changes.name.as_deref(),
            email: changes.email.as_deref(),
            bio: changes.bio.as_deref(),
            image: changes.image.as_deref(),
            cover_image: changes.cover_image.as_deref(),
            updated_at: Utc::now(),
        };
        let mut conn = self.conn().await?;
        diesel::update(users::table.find(id))
            .set(&changeset)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(conflict_on_unique("Email already in use"))?
            .map(User::try_from)
            .transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(users::table.find(id))
            .set((
                users::password_hash.eq(Some(password_hash)),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;
        Ok(updated > 0)
    }

    async fn set_preference(
        &self,
        id: Uuid,
        group: PreferenceGroup,
        key: &str,
        enabled: bool,
    ) -> StoreResult<bool> {
        let column = group.column();
        let mut conn = self.conn().await?;
        let updated = diesel::sql_query(format!(
            "UPDATE users SET {column} = jsonb_set({column}, ARRAY[$2], to_jsonb($3)),
                updated_at = now()
             WHERE id = $1"
        ))
        .bind::<sql_types::Uuid, _>(id)
        .bind::<sql_types::Text, _>(key)
        .bind::<sql_types::Bool, _>(enabled)
        .execute(&mut conn)
        .await?;
        Ok(updated > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                // Comments the user left on other people's recipes
                let authored: Vec<(Uuid, Uuid)> = comments::table
                    .filter(comments::author_id.eq(id))
                    .select((comments::id, comments::recipe_id))
                    .load(conn)
                    .await?;
                for (comment_id, recipe_id) in &authored {
                    diesel::sql_query(PULL_RECIPE_COMMENTS)
                        .bind::<sql_types::Uuid, _>(*recipe_id)
                        .bind::<sql_types::Array<sql_types::Uuid>, _>(vec![*comment_id])
                        .execute(conn)
                        .await?;
                }

                // Owned recipes are about to go; cookbooks hold them without a foreign key
                diesel::sql_query(
                    "UPDATE cookbooks
                     SET recipes = ARRAY(
                         SELECT r FROM unnest(recipes) AS r
                         WHERE r NOT IN (SELECT id FROM recipes WHERE author_id = $1))
                     WHERE recipes && ARRAY(SELECT id FROM recipes WHERE author_id = $1)",
                )
                .bind::<sql_types::Uuid, _>(id)
                .execute(conn)
                .await?;

                // Cascades remove owned recipes, comments, cookbooks, meal plans,
                // activities and notifications; replies lose their parent.
                let deleted = diesel::delete(users::table.find(id)).execute(conn).await?;
                if deleted == 0 {
                    return Ok(false);
                }

                for statement in [
                    "UPDATE users SET followers = array_remove(followers, $1),
                        following = array_remove(following, $1),
                        blocked_users = array_remove(blocked_users, $1)
                     WHERE $1 = ANY(followers) OR $1 = ANY(following) OR $1 = ANY(blocked_users)",
                    "UPDATE recipes SET likes = array_remove(likes, $1) WHERE $1 = ANY(likes)",
                    "UPDATE comments SET likes = array_remove(likes, $1) WHERE $1 = ANY(likes)",
                    "UPDATE cookbooks SET collaborators = array_remove(collaborators, $1)
                     WHERE $1 = ANY(collaborators)",
                    "UPDATE meal_plans SET collaborators = array_remove(collaborators, $1)
                     WHERE $1 = ANY(collaborators)",
                ] {
                    diesel::sql_query(statement)
                        .bind::<sql_types::Uuid, _>(id)
                        .execute(conn)
                        .await?;
                }
                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }

    async fn add_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        if follower == target {
            return Ok(false);
        }
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let present: i64 = users::table
                    .filter(users::id.eq_any(vec![follower, target]))
                    .count()
                    .get_result(conn)
                    .await?;
                if present != 2 {
                    return Ok(false);
                }
                let added = diesel::sql_query(
                    "UPDATE users SET following = array_append(following, $2)
                     WHERE id = $1 AND NOT ($2 = ANY(following))",
                )
                .bind::<sql_types::Uuid, _>(follower)
                .bind::<sql_types::Uuid, _>(target)
                .execute(conn)
                .await?;
                diesel::sql_query(
                    "UPDATE users SET followers = array_append(followers, $2)
                     WHERE id = $1 AND NOT ($2 = ANY(followers))",
                )
                .bind::<sql_types::Uuid, _>(target)
                .bind::<sql_types::Uuid, _>(follower)
                .execute(conn)
                .await?;
                Ok(added > 0)
            }
            .scope_boxed()
        })
        .await
    }

    async fn remove_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let removed = diesel::sql_query(
                    "UPDATE users SET following = array_remove(following, $2)
                     WHERE id = $1 AND $2 = ANY(following)",
                )
                .bind::<sql_types::Uuid, _>(follower)
                .bind::<sql_types::Uuid, _>(target)
                .execute(conn)
                .await?;
                diesel::sql_query(
                    "UPDATE users SET followers = array_remove(followers, $2)
                     WHERE id = $1 AND $2 = ANY(followers)",
                )
                .bind::<sql_types::Uuid, _>(target)
                .bind::<sql_types::Uuid, _>(follower)
                .execute(conn)
                .await?;
                Ok(removed > 0)
            }
            .scope_boxed()
        })
        .await
    }

    async fn add_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool> {
        if blocker == target {
            return Ok(false);
        }
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let target_exists: i64 = users::table
                    .find(target)
                    .count()
                    .get_result(conn)
                    .await?;
                if target_exists == 0 {
                    return Ok(false);
                }
                let added = diesel::sql_query(
                    "UPDATE users SET blocked_users = array_append(blocked_users, $2)
                     WHERE id = $1 AND NOT ($2 = ANY(blocked_users))",
                )
                .bind::<sql_types::Uuid, _>(blocker)
                .bind::<sql_types::Uuid, _>(target)
                .execute(conn)
                .await?;
                // Drop follow edges in both directions
                for (a, b) in [(blocker, target), (target, blocker)] {
                    diesel::sql_query(
                        "UPDATE users SET following = array_remove(following, $2),
                            followers = array_remove(followers, $2)
                         WHERE id = $1",
                    )
                    .bind::<sql_types::Uuid, _>(a)
                    .bind::<sql_types::Uuid, _>(b)
                    .execute(conn)
                    .await?;
                }
                Ok(added > 0)
            }
            .scope_boxed()
        })
        .await
    }

    async fn remove_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool> {
        self.array_pull("users", "blocked_users", blocker, target, false).await
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let row = RecipeRow::try_from(recipe)?;
        let mut conn = self.conn().await?;
        diesel::insert_into(recipes::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(conflict_on_unique(format!("Slug '{}' already exists", recipe.slug)))?;
        Ok(())
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        let mut conn = self.conn().await?;
        recipes::table
            .find(id)
            .select(RecipeRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Recipe::try_from)
            .transpose()
    }

    async fn get_recipe_by_slug(&self, slug: &str) -> StoreResult<Option<Recipe>> {
        let mut conn = self.conn().await?;
        recipes::table
            .filter(recipes::slug.eq(slug))
            .select(RecipeRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Recipe::try_from)
            .transpose()
    }

    async fn get_recipes(&self, ids: &[Uuid]) -> StoreResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let rows = recipes::table
            .filter(recipes::id.eq_any(ids.to_vec()))
            .select(RecipeRow::as_select())
            .load(&mut conn)
            .await?;
        let found: Vec<Recipe> = convert_all(rows)?;
        Ok(in_order_of(ids, found, |r| r.id))
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<(Vec<Recipe>, i64)> {
        let mut conn = self.conn().await?;
        let total: i64 = recipe_filter(query).count().get_result(&mut conn).await?;
        let rows = recipe_filter(query)
            .order(recipes::created_at.desc())
            .offset(query.offset)
            .limit(query.limit)
            .select(RecipeRow::as_select())
            .load(&mut conn)
            .await?;
        Ok((convert_all(rows)?, total))
    }

    async fn count_recipes_by_author(&self, author_id: Uuid) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(recipes::table
            .filter(recipes::author_id.eq(author_id))
            .count()
            .get_result(&mut conn)
            .await?)
    }

    async fn update_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        let changeset = RecipeChangeset::try_from(recipe)?;
        let mut conn = self.conn().await?;
        let updated = diesel::update(recipes::table.find(recipe.id))
            .set(&changeset)
            .execute(&mut conn)
            .await
            .map_err(conflict_on_unique(format!("Slug '{}' already exists", recipe.slug)))?;
        Ok(updated > 0)
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let deleted = diesel::delete(recipes::table.find(id)).execute(conn).await?;
                if deleted == 0 {
                    return Ok(false);
                }
                diesel::sql_query(
                    "UPDATE cookbooks SET recipes = array_remove(recipes, $1) WHERE $1 = ANY(recipes)",
                )
                .bind::<sql_types::Uuid, _>(id)
                .execute(conn)
                .await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }

    async fn add_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.array_add("recipes", "likes", recipe_id, user_id, false).await
    }

    async fn remove_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.array_pull("recipes", "likes", recipe_id, user_id, false).await
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        let row = CommentRow::from(comment);
        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let attached = diesel::sql_query(
                    "UPDATE recipes SET comments = array_append(comments, $2) WHERE id = $1",
                )
                .bind::<sql_types::Uuid, _>(row.recipe_id)
                .bind::<sql_types::Uuid, _>(row.id)
                .execute(conn)
                .await?;
                if attached == 0 {
                    return Err(StoreError::NotFound("Recipe"));
                }
                diesel::insert_into(comments::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let mut conn = self.conn().await?;
        Ok(comments::table
            .find(id)
            .select(CommentRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Comment::from))
    }

    async fn get_comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let rows = comments::table
            .filter(comments::id.eq_any(ids.to_vec()))
            .select(CommentRow::as_select())
            .load(&mut conn)
            .await?;
        let found: Vec<Comment> = rows.into_iter().map(Comment::from).collect();
        Ok(in_order_of(ids, found, |c| c.id))
    }

    async fn list_comments_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Comment>> {
        let mut conn = self.conn().await?;
        let rows = comments::table
            .filter(comments::recipe_id.eq(recipe_id))
            .order(comments::created_at.asc())
            .select(CommentRow::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn list_comments_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Comment>> {
        let mut conn = self.conn().await?;
        let rows = comments::table
            .filter(comments::author_id.eq(author_id))
            .order(comments::created_at.asc())
            .select(CommentRow::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let root = match self.get_comment(id).await? {
            Some(comment) => comment,
            None => return Ok(false),
        };
        let siblings = self.list_comments_for_recipe(root.recipe_id).await?;
        let ids = thread_ids(id, &siblings);

        let mut conn = self.conn().await?;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                diesel::delete(comments::table.filter(comments::id.eq_any(ids.clone())))
                    .execute(conn)
                    .await?;
                diesel::sql_query(PULL_RECIPE_COMMENTS)
                    .bind::<sql_types::Uuid, _>(root.recipe_id)
                    .bind::<sql_types::Array<sql_types::Uuid>, _>(ids)
                    .execute(conn)
                    .await?;
                Ok(true)
            }
            .scope_boxed()
        })
        .await
    }

    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.array_add("comments", "likes", comment_id, user_id, false).await
    }

    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.array_pull("comments", "likes", comment_id, user_id, false).await
    }

    async fn insert_cookbook(&self, cookbook: &Cookbook) -> StoreResult<()> {
        let row = CookbookRow::from(cookbook);
        let mut conn = self.conn().await?;
        diesel::insert_into(cookbooks::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_cookbook(&self, id: Uuid) -> StoreResult<Option<Cookbook>> {
        let mut conn = self.conn().await?;
        Ok(cookbooks::table
            .find(id)
            .select(CookbookRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(Cookbook::from))
    }

    async fn get_cookbooks(&self, ids: &[Uuid]) -> StoreResult<Vec<Cookbook>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let rows = cookbooks::table
            .filter(cookbooks::id.eq_any(ids.to_vec()))
            .select(CookbookRow::as_select())
            .load(&mut conn)
            .await?;
        let found: Vec<Cookbook> = rows.into_iter().map(Cookbook::from).collect();
        Ok(in_order_of(ids, found, |c| c.id))
    }

    async fn list_cookbooks(&self, owner_id: Uuid) -> StoreResult<Vec<Cookbook>> {
        let mut conn = self.conn().await?;
        let rows = cookbooks::table
            .filter(cookbooks::owner_id.eq(owner_id))
            .order(cookbooks::created_at.desc())
            .select(CookbookRow::as_select())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Cookbook::from).collect())
    }

    async fn update_cookbook(&self, cookbook: &Cookbook) -> StoreResult<bool> {
        let changeset = CookbookChangeset {
            title: &cookbook.title,
            description: cookbook.description.as_deref(),
            cover_image: cookbook.cover_image.as_deref(),
            is_public: cookbook.is_public,
            tags: &cookbook.tags,
            updated_at: cookbook.updated_at,
        };
        let mut conn = self.conn().await?;
        let updated = diesel::update(cookbooks::table.find(cookbook.id))
            .set(&changeset)
            .execute(&mut conn)
            .await?;
        Ok(updated > 0)
    }

    async fn delete_cookbook(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(cookbooks::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn add_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        self.array_add("cookbooks", "recipes", cookbook_id, recipe_id, true).await
    }

    async fn remove_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        self.array_pull("cookbooks", "recipes", cookbook_id, recipe_id, true).await
    }

    async fn add_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let updated = diesel::sql_query(
            "UPDATE cookbooks SET collaborators = array_append(collaborators, $2), updated_at = now()
             WHERE id = $1 AND owner_id <> $2 AND NOT ($2 = ANY(collaborators))",
        )
        .bind::<sql_types::Uuid, _>(cookbook_id)
        .bind::<sql_types::Uuid, _>(user_id)
        .execute(&mut conn)
        .await?;
        Ok(updated > 0)
    }

    async fn remove_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.array_pull("cookbooks", "collaborators", cookbook_id, user_id, true).await
    }

    async fn insert_meal_plan(&self, plan: &MealPlan) -> StoreResult<()> {
        let row = MealPlanRow::try_from(plan)?;
        let mut conn = self.conn().await?;
        diesel::insert_into(meal_plans::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_meal_plan(&self, id: Uuid) -> StoreResult<Option<MealPlan>> {
        let mut conn = self.conn().await?;
        meal_plans::table
            .find(id)
            .select(MealPlanRow::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .map(MealPlan::try_from)
            .transpose()
    }

    async fn list_meal_plans(&self, user_id: Uuid) -> StoreResult<Vec<MealPlan>> {
        let mut conn = self.conn().await?;
        let rows = meal_plans::table
            .filter(
                meal_plans::owner_id
                    .eq(user_id)
                    .or(meal_plans::collaborators.contains(vec![user_id])),
            )
            .order(meal_plans::start_date.asc())
            .select(MealPlanRow::as_select())
            .load(&mut conn)
            .await?;
        convert_all(rows)
    }

    async fn delete_meal_plan(&self, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(meal_plans::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn add_meal(
        &self,
        plan_id: Uuid,
        date: NaiveDate,
        time: MealTime,
        meal: Meal,
    ) -> StoreResult<Option<MealPlan>> {
        self.modify_meal_plan(plan_id, move |plan| {
            plan.add_meal(date, time, meal);
            true
        })
        .await
    }

    async fn add_grocery_item(&self, plan_id: Uuid, mut item: GroceryItem) -> StoreResult<Option<MealPlan>> {
        item.checked = false;
        // Concatenating two jsonb arrays appends
        let item = serde_json::Value::Array(vec![serde_json::to_value(&item)?]);
        let mut conn = self.conn().await?;
        diesel::update(meal_plans::table.find(plan_id))
            .set((
                meal_plans::grocery_list.eq(meal_plans::grocery_list.concat(item)),
                meal_plans::updated_at.eq(Utc::now()),
            ))
            .returning(MealPlanRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .map(MealPlan::try_from)
            .transpose()
    }

    async fn toggle_grocery_item(&self, plan_id: Uuid, index: usize) -> StoreResult<Option<MealPlan>> {
        self.modify_meal_plan(plan_id, move |plan| plan.toggle_grocery_item(index).is_some())
            .await
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        let row = ActivityRow::from(activity);
        let mut conn = self.conn().await?;
        diesel::insert_into(activities::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_activities(&self, query: &ActivityQuery) -> StoreResult<(Vec<Activity>, i64)> {
        let mut conn = self.conn().await?;
        let total: i64 = activity_filter(query).count().get_result(&mut conn).await?;
        let rows = activity_filter(query)
            .order(activities::created_at.desc())
            .offset(query.offset)
            .limit(query.limit)
            .select(ActivityRow::as_select())
            .load(&mut conn)
            .await?;
        Ok((convert_all(rows)?, total))
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let row = NotificationRow::from(notification);
        let mut conn = self.conn().await?;
        diesel::insert_into(notifications::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> StoreResult<Vec<Notification>> {
        let mut conn = self.conn().await?;
        let rows = notifications::table
            .filter(notifications::recipient_id.eq(recipient_id))
            .order(notifications::created_at.desc())
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await?;
        convert_all(rows)
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        Ok(notifications::table
            .filter(notifications::recipient_id.eq(recipient_id))
            .filter(notifications::read.eq(false))
            .count()
            .get_result(&mut conn)
            .await?)
    }

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient_id))
                .filter(notifications::read.eq(false)),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)
        .await?;
        Ok(updated as u64)
    }

    async fn mark_notifications_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient_id))
                .filter(notifications::id.eq_any(ids.to_vec())),
        )
        .set(notifications::read.eq(true))
        .execute(&mut conn)
        .await?;
        Ok(updated as u64)
    }

    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(
            notifications::table
                .filter(notifications::recipient_id.eq(recipient_id))
                .filter(notifications::id.eq(id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted > 0)
    }

    async fn delete_all_notifications(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(
            notifications::table.filter(notifications::recipient_id.eq(recipient_id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, NewNotification, NotificationType};

    #[test]
    fn rows_keep_caller_order() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let shuffled = vec![ids[2], ids[0]];
        assert_eq!(in_order_of(&ids, shuffled, |id| *id), vec![ids[0], ids[2]]);
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let err = conflict_on_unique("Email already in use")(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        ));
        assert!(matches!(err, StoreError::Conflict(m) if m == "Email already in use"));

        let err = conflict_on_unique("x")(DieselError::NotFound);
        assert!(matches!(err, StoreError::Database(DieselError::NotFound)));
    }

    #[test]
    fn recipe_row_preserves_nested_documents() {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            title: "Pad Thai".into(),
            slug: "pad-thai".into(),
            description: None,
            ingredients: vec![crate::models::Ingredient {
                item: "Rice noodles".into(),
                amount: "200".into(),
                unit: Some("g".into()),
            }],
            steps: vec![],
            media: vec![],
            tags: vec!["thai".into()],
            difficulty: Difficulty::Medium,
            prep_time: 15,
            cook_time: 10,
            servings: 2,
            author_id: Uuid::new_v4(),
            likes: vec![],
            comments: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let row = RecipeRow::try_from(&recipe).unwrap();
        assert_eq!(row.difficulty, "medium");
        let back = Recipe::try_from(row).unwrap();
        assert_eq!(back.ingredients, recipe.ingredients);
        assert_eq!(back.difficulty, Difficulty::Medium);
    }

    #[test]
    fn unknown_notification_type_is_a_decode_error() {
        let n = NewNotification::new(Uuid::new_v4(), Uuid::new_v4(), NotificationType::Follow)
            .into_notification(Utc::now());
        let mut row = NotificationRow::from(&n);
        row.notification_type = "poke".into();
        assert!(matches!(Notification::try_from(row), Err(StoreError::Decode(_))));
    }
}
