// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::comment::thread_ids;
use crate::models::user;
use crate::models::{
    add_to_set, pull, Activity, ActivityQuery, Comment, Cookbook, GroceryItem, Meal, MealPlan,
    MealTime, NewUser, Notification, PreferenceGroup, ProfileChanges, Recipe, RecipeQuery, User,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    recipes: HashMap<Uuid, Recipe>,
    comments: HashMap<Uuid, Comment>,
    cookbooks: HashMap<Uuid, Cookbook>,
    meal_plans: HashMap<Uuid, MealPlan>,
    activities: Vec<Activity>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    /// Mutable access to two distinct users at once
    fn user_pair(&mut self, a: Uuid, b: Uuid) -> Option<(User, User)> {
        if a == b {
            return None;
        }
        let first = self.users.remove(&a)?;
        match self.users.remove(&b) {
            Some(second) => Some((first, second)),
            None => {
                self.users.insert(a, first);
                None
            }
        }
    }

    fn put_pair(&mut self, a: User, b: User) {
        self.users.insert(a.id, a);
        self.users.insert(b.id, b);
    }

    fn remove_comments(&mut self, ids: &[Uuid]) {
        for id in ids {
            if let Some(comment) = self.comments.remove(id) {
                if let Some(recipe) = self.recipes.get_mut(&comment.recipe_id) {
                    pull(&mut recipe.comments, comment.id);
                }
            }
        }
    }

    fn remove_recipe(&mut self, id: Uuid) -> bool {
        if self.recipes.remove(&id).is_none() {
            return false;
        }
        let comment_ids: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| c.recipe_id == id)
            .map(|c| c.id)
            .collect();
        self.remove_comments(&comment_ids);
        for cookbook in self.cookbooks.values_mut() {
            pull(&mut cookbook.recipes, id);
        }
        self.activities.retain(|a| a.recipe_id != Some(id));
        self.notifications.retain(|n| n.recipe_id != Some(id));
        true
    }
}

/// In-process store guarded by a single lock
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a set change to one cookbook, touching `updated_at` when it changed
    async fn modify_cookbook(&self, id: Uuid, change: impl FnOnce(&mut Cookbook) -> bool) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.cookbooks.get_mut(&id) {
            Some(cookbook) => {
                if change(cookbook) {
                    cookbook.updated_at = Utc::now();
                    true
                } else {
                    false
                }
            }
            None => false,
        })
    }

    async fn modify_meal_plan(&self, id: Uuid, change: impl FnOnce(&mut MealPlan) -> bool) -> Option<MealPlan> {
        let mut state = self.state.write().await;
        let plan = state.meal_plans.get_mut(&id)?;
        if !change(plan) {
            return None;
        }
        plan.updated_at = Utc::now();
        Some(plan.clone())
    }
}

fn page<T: Clone>(items: &[T], offset: i64, limit: i64) -> Vec<T> {
    items
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&new_user.email, None) {
            return Err(StoreError::Conflict("Email already in use".into()));
        }
        let user = User::new(new_user, Utc::now());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("Email already in use".into()));
            }
        }
        Ok(state.users.get_mut(&id).map(|user| {
            user.apply(changes, Utc::now());
            user.clone()
        }))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_preference(
        &self,
        id: Uuid,
        group: PreferenceGroup,
        key: &str,
        enabled: bool,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.users.get_mut(&id) {
            Some(user) => {
                if user.set_preference(group, key, enabled) {
                    user.updated_at = Utc::now();
                    true
                } else {
                    false
                }
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let recipe_ids: Vec<Uuid> = state
            .recipes
            .values()
            .filter(|r| r.author_id == id)
            .map(|r| r.id)
            .collect();
        for recipe_id in recipe_ids {
            state.remove_recipe(recipe_id);
        }

        let authored: Vec<Uuid> = state
            .comments
            .values()
            .filter(|c| c.author_id == id)
            .map(|c| c.id)
            .collect();
        state.remove_comments(&authored);
        for comment in state.comments.values_mut() {
            if comment.parent_id.map_or(false, |p| authored.contains(&p)) {
                comment.parent_id = None;
            }
            pull(&mut comment.likes, id);
        }

        state.cookbooks.retain(|_, c| c.owner_id != id);
        for cookbook in state.cookbooks.values_mut() {
            pull(&mut cookbook.collaborators, id);
        }
        state.meal_plans.retain(|_, p| p.owner_id != id);
        for plan in state.meal_plans.values_mut() {
            pull(&mut plan.collaborators, id);
        }
        for recipe in state.recipes.values_mut() {
            pull(&mut recipe.likes, id);
        }
        for other in state.users.values_mut() {
            pull(&mut other.followers, id);
            pull(&mut other.following, id);
            pull(&mut other.blocked_users, id);
        }
        state
            .activities
            .retain(|a| a.actor_id != id && a.target_user_id != Some(id));
        state
            .notifications
            .retain(|n| n.recipient_id != id && n.sender_id != id);
        Ok(true)
    }

    async fn add_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let (mut a, mut b) = match state.user_pair(follower, target) {
            Some(pair) => pair,
            None => return Ok(false),
        };
        let changed = user::follow(&mut a, &mut b);
        state.put_pair(a, b);
        Ok(changed)
    }

    async fn remove_follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let (mut a, mut b) = match state.user_pair(follower, target) {
            Some(pair) => pair,
            None => return Ok(false),
        };
        let changed = user::unfollow(&mut a, &mut b);
        state.put_pair(a, b);
        Ok(changed)
    }

    async fn add_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let (mut a, mut b) = match state.user_pair(blocker, target) {
            Some(pair) => pair,
            None => return Ok(false),
        };
        let changed = user::block(&mut a, &mut b);
        state.put_pair(a, b);
        Ok(changed)
    }

    async fn remove_block(&self, blocker: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .get_mut(&blocker)
            .map_or(false, |user| user::unblock(user, target)))
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.recipes.values().any(|r| r.slug == recipe.slug) {
            return Err(StoreError::Conflict(format!("Slug '{}' already exists", recipe.slug)));
        }
        state.recipes.insert(recipe.id, recipe.clone());
        Ok(())
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        Ok(self.state.read().await.recipes.get(&id).cloned())
    }

    async fn get_recipe_by_slug(&self, slug: &str) -> StoreResult<Option<Recipe>> {
        let state = self.state.read().await;
        Ok(state.recipes.values().find(|r| r.slug == slug).cloned())
    }

    async fn get_recipes(&self, ids: &[Uuid]) -> StoreResult<Vec<Recipe>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.recipes.get(id).cloned()).collect())
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<(Vec<Recipe>, i64)> {
        let state = self.state.read().await;
        let tag = query.tag.as_ref().map(|t| t.to_lowercase());
        let mut matches: Vec<Recipe> = state
            .recipes
            .values()
            .filter(|r| query.author_id.map_or(true, |a| r.author_id == a))
            .filter(|r| tag.as_ref().map_or(true, |t| r.tags.contains(t)))
            .filter(|r| {
                state
                    .users
                    .get(&r.author_id)
                    .map_or(true, |author| author.recipes_visible_to(query.viewer_id))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len() as i64;
        Ok((page(&matches, query.offset, query.limit), total))
    }

    async fn count_recipes_by_author(&self, author_id: Uuid) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.recipes.values().filter(|r| r.author_id == author_id).count() as i64)
    }

    async fn update_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state
            .recipes
            .values()
            .any(|r| r.slug == recipe.slug && r.id != recipe.id)
        {
            return Err(StoreError::Conflict(format!("Slug '{}' already exists", recipe.slug)));
        }
        Ok(match state.recipes.get_mut(&recipe.id) {
            Some(existing) => {
                *existing = recipe.clone();
                true
            }
            None => false,
        })
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.remove_recipe(id))
    }

    async fn add_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .recipes
            .get_mut(&recipe_id)
            .map_or(false, |r| add_to_set(&mut r.likes, user_id)))
    }

    async fn remove_recipe_like(&self, recipe_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .recipes
            .get_mut(&recipe_id)
            .map_or(false, |r| pull(&mut r.likes, user_id)))
    }

    async fn insert_comment(&self, comment: &Comment) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let recipe = state
            .recipes
            .get_mut(&comment.recipe_id)
            .ok_or(StoreError::NotFound("Recipe"))?;
        add_to_set(&mut recipe.comments, comment.id);
        state.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn get_comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.comments.get(id).cloned()).collect())
    }

    async fn list_comments_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.recipe_id == recipe_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn list_comments_by_author(&self, author_id: Uuid) -> StoreResult<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.author_id == author_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let recipe_id = match state.comments.get(&id) {
            Some(comment) => comment.recipe_id,
            None => return Ok(false),
        };
        let siblings: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.recipe_id == recipe_id)
            .cloned()
            .collect();
        let ids = thread_ids(id, &siblings);
        state.remove_comments(&ids);
        state
            .activities
            .retain(|a| a.comment_id.map_or(true, |c| !ids.contains(&c)));
        state
            .notifications
            .retain(|n| n.comment_id.map_or(true, |c| !ids.contains(&c)));
        Ok(true)
    }

    async fn add_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .comments
            .get_mut(&comment_id)
            .map_or(false, |c| add_to_set(&mut c.likes, user_id)))
    }

    async fn remove_comment_like(&self, comment_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .comments
            .get_mut(&comment_id)
            .map_or(false, |c| pull(&mut c.likes, user_id)))
    }

    async fn insert_cookbook(&self, cookbook: &Cookbook) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.cookbooks.insert(cookbook.id, cookbook.clone());
        Ok(())
    }

    async fn get_cookbook(&self, id: Uuid) -> StoreResult<Option<Cookbook>> {
        Ok(self.state.read().await.cookbooks.get(&id).cloned())
    }

    async fn get_cookbooks(&self, ids: &[Uuid]) -> StoreResult<Vec<Cookbook>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.cookbooks.get(id).cloned()).collect())
    }

    async fn list_cookbooks(&self, owner_id: Uuid) -> StoreResult<Vec<Cookbook>> {
        let state = self.state.read().await;
        let mut cookbooks: Vec<Cookbook> = state
            .cookbooks
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        cookbooks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cookbooks)
    }

    async fn update_cookbook(&self, cookbook: &Cookbook) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.cookbooks.get_mut(&cookbook.id) {
            Some(existing) => {
                existing.title = cookbook.title.clone();
                existing.description = cookbook.description.clone();
                existing.cover_image = cookbook.cover_image.clone();
                existing.is_public = cookbook.is_public;
                existing.tags = cookbook.tags.clone();
                existing.updated_at = cookbook.updated_at;
                true
            }
            None => false,
        })
    }

    async fn delete_cookbook(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.cookbooks.remove(&id).is_some();
        if removed {
            state.activities.retain(|a| a.cookbook_id != Some(id));
            state.notifications.retain(|n| n.cookbook_id != Some(id));
        }
        Ok(removed)
    }

    async fn add_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        self.modify_cookbook(cookbook_id, |c| c.add_recipe(recipe_id)).await
    }

    async fn remove_cookbook_recipe(&self, cookbook_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        self.modify_cookbook(cookbook_id, |c| c.remove_recipe(recipe_id)).await
    }

    async fn add_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.modify_cookbook(cookbook_id, |c| c.add_collaborator(user_id)).await
    }

    async fn remove_cookbook_collaborator(&self, cookbook_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.modify_cookbook(cookbook_id, |c| c.remove_collaborator(user_id)).await
    }

    async fn insert_meal_plan(&self, plan: &MealPlan) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.meal_plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get_meal_plan(&self, id: Uuid) -> StoreResult<Option<MealPlan>> {
        Ok(self.state.read().await.meal_plans.get(&id).cloned())
    }

    async fn list_meal_plans(&self, user_id: Uuid) -> StoreResult<Vec<MealPlan>> {
        let state = self.state.read().await;
        let mut plans: Vec<MealPlan> = state
            .meal_plans
            .values()
            .filter(|p| p.has_access(user_id))
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(plans)
    }

    async fn delete_meal_plan(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.meal_plans.remove(&id).is_some())
    }

    async fn add_meal(
        &self,
        plan_id: Uuid,
        date: NaiveDate,
        time: MealTime,
        meal: Meal,
    ) -> StoreResult<Option<MealPlan>> {
        Ok(self
            .modify_meal_plan(plan_id, |plan| {
                plan.add_meal(date, time, meal);
                true
            })
            .await)
    }

    async fn add_grocery_item(&self, plan_id: Uuid, item: GroceryItem) -> StoreResult<Option<MealPlan>> {
        Ok(self
            .modify_meal_plan(plan_id, |plan| {
                plan.add_grocery_item(item);
                true
            })
            .await)
    }

    async fn toggle_grocery_item(&self, plan_id: Uuid, index: usize) -> StoreResult<Option<MealPlan>> {
        Ok(self
            .modify_meal_plan(plan_id, |plan| plan.toggle_grocery_item(index).is_some())
            .await)
    }

    async fn insert_activity(&self, activity: &Activity) -> StoreResult<()> {
        self.state.write().await.activities.push(activity.clone());
        Ok(())
    }

    async fn list_activities(&self, query: &ActivityQuery) -> StoreResult<(Vec<Activity>, i64)> {
        let state = self.state.read().await;
        let mut matches: Vec<Activity> = state
            .activities
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matches.len() as i64;
        Ok((page(&matches, query.offset, query.limit), total))
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.state.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, recipient_id: Uuid) -> StoreResult<Vec<Notification>> {
        let state = self.state.read().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as i64)
    }

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn mark_notifications_read(&self, recipient_id: Uuid, ids: &[Uuid]) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && ids.contains(&n.id))
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, recipient_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == id && n.recipient_id == recipient_id));
        Ok(state.notifications.len() != before)
    }

    async fn delete_all_notifications(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state.notifications.retain(|n| n.recipient_id != recipient_id);
        Ok((before - state.notifications.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn new_user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        new_user(&store, "ana").await;
        let err = store
            .insert_user(NewUser {
                name: "Other".into(),
                email: "ANA@example.com".into(),
                password_hash: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_two_sided() {
        let store = MemoryStore::new();
        let a = new_user(&store, "ana").await;
        let b = new_user(&store, "ben").await;

        assert!(store.add_follow(a.id, b.id).await.unwrap());
        assert!(!store.add_follow(a.id, b.id).await.unwrap());
        assert!(!store.add_follow(a.id, a.id).await.unwrap());

        let a = store.get_user(a.id).await.unwrap().unwrap();
        let b = store.get_user(b.id).await.unwrap().unwrap();
        assert_eq!(a.following, vec![b.id]);
        assert_eq!(b.followers, vec![a.id]);
    }

    #[tokio::test]
    async fn deleting_a_user_cleans_up_references() {
        let store = MemoryStore::new();
        let a = new_user(&store, "ana").await;
        let b = new_user(&store, "ben").await;
        store.add_follow(a.id, b.id).await.unwrap();
        store.add_follow(b.id, a.id).await.unwrap();

        assert!(store.delete_user(a.id).await.unwrap());
        assert!(store.get_user(a.id).await.unwrap().is_none());
        let b = store.get_user(b.id).await.unwrap().unwrap();
        assert!(b.followers.is_empty());
        assert!(b.following.is_empty());
        assert!(!store.delete_user(a.id).await.unwrap());
    }
}
