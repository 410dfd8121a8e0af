// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod activity;
pub mod comment;
pub mod cookbook;
pub mod meal_plan;
pub mod notification;
pub mod recipe;
pub mod user;

pub use activity::{Activity, ActivityFilter, ActivityQuery, ActivityScope, ActivityType, TargetKind};
pub use comment::{Comment, CommentDraft};
pub use cookbook::{Cookbook, CookbookDraft};
pub use meal_plan::{GroceryItem, Meal, MealDay, MealPlan, MealPlanDraft, MealTime};
pub use notification::{NewNotification, Notification, NotificationType};
pub use recipe::{Difficulty, Ingredient, Media, MediaKind, Recipe, RecipeDraft, RecipeQuery, Step};
pub use user::{
    NewUser, NotificationPreferences, PreferenceGroup, PrivacyPreferences, ProfileChanges,
    RelationshipError, User, UserStats,
};

use uuid::Uuid;

/// Insert `id` unless present; returns whether the set changed
pub fn add_to_set(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    if ids.contains(&id) {
        false
    } else {
        ids.push(id);
        true
    }
}

/// Remove every occurrence of `id`; returns whether the set changed
pub fn pull(ids: &mut Vec<Uuid>, id: Uuid) -> bool {
    let before = ids.len();
    ids.retain(|existing| *existing != id);
    ids.len() != before
}

/// Trim and lower-case tags, dropping empties and duplicates
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_helpers_are_idempotent() {
        let a = Uuid::new_v4();
        let mut ids = Vec::new();
        assert!(add_to_set(&mut ids, a));
        assert!(!add_to_set(&mut ids, a));
        assert_eq!(ids, vec![a]);
        assert!(pull(&mut ids, a));
        assert!(!pull(&mut ids, a));
        assert!(ids.is_empty());
    }

    #[test]
    fn tags_are_normalized() {
        let tags = vec![" Vegan ".to_string(), "vegan".into(), "".into(), "Quick".into()];
        assert_eq!(normalize_tags(&tags), vec!["vegan", "quick"]);
    }
}
