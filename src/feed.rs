// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Activity feed shaping: populated activity views and the grouped view that
//! collapses repeated actions on the same target.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Activity, ActivityType, TargetKind};
use crate::services::views::{CommentSummary, CookbookSummary, RecipeSummary, UserSummary};

/// Activities older than this are left out of the grouped view
pub const GROUPING_WINDOW_HOURS: i64 = 24;

/// An activity with its references resolved for display
#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub actor: UserSummary,
    pub recipe: Option<RecipeSummary>,
    pub cookbook: Option<CookbookSummary>,
    pub comment: Option<CommentSummary>,
    pub target_user: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    target: Option<(TargetKind, Uuid)>,
}

impl ActivityView {
    pub fn new(activity: &Activity, actor: UserSummary) -> Self {
        Self {
            id: activity.id,
            activity_type: activity.activity_type,
            actor,
            recipe: None,
            cookbook: None,
            comment: None,
            target_user: None,
            created_at: activity.created_at,
            target: activity.target(),
        }
    }

    /// Display name of whatever the activity is about
    fn target_name(&self) -> Option<&str> {
        match self.target?.0 {
            TargetKind::Recipe => self.recipe.as_ref().map(|r| r.title.as_str()),
            TargetKind::Cookbook => self.cookbook.as_ref().map(|c| c.title.as_str()),
            TargetKind::User => self.target_user.as_ref().map(|u| u.name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityGroup {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub target_type: Option<TargetKind>,
    pub target_id: Option<Uuid>,
    pub target_name: Option<String>,
    pub actors: Vec<UserSummary>,
    pub activity_ids: Vec<Uuid>,
    pub latest_at: DateTime<Utc>,
    pub message: String,
}

type GroupKey = (ActivityType, Option<(TargetKind, Uuid)>);

/// Collapse activities of the same type on the same target within the window.
///
/// Actors are deduplicated in order of first appearance; groups come back most
/// recent first.
pub fn group_activities(activities: &[ActivityView], now: DateTime<Utc>) -> Vec<ActivityGroup> {
    let window = Duration::hours(GROUPING_WINDOW_HOURS);
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<ActivityGroup> = Vec::new();

    for view in activities {
        if now - view.created_at > window {
            continue;
        }
        let key = (view.activity_type, view.target);
        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                if !group.actors.iter().any(|a| a.id == view.actor.id) {
                    group.actors.push(view.actor.clone());
                }
                group.activity_ids.push(view.id);
                if view.created_at > group.latest_at {
                    group.latest_at = view.created_at;
                }
                if group.target_name.is_none() {
                    group.target_name = view.target_name().map(str::to_string);
                }
            }
            None => {
                index.insert(key, groups.len());
                groups.push(ActivityGroup {
                    activity_type: view.activity_type,
                    target_type: view.target.map(|(kind, _)| kind),
                    target_id: view.target.map(|(_, id)| id),
                    target_name: view.target_name().map(str::to_string),
                    actors: vec![view.actor.clone()],
                    activity_ids: vec![view.id],
                    latest_at: view.created_at,
                    message: String::new(),
                });
            }
        }
    }

    groups.sort_by(|a, b| b.latest_at.cmp(&a.latest_at));
    for group in &mut groups {
        group.message = group_message(group);
    }
    groups
}

/// "Ana", "Ana and 1 other", "Ana and 3 others"
pub fn actor_phrase(actors: &[UserSummary]) -> String {
    let first = actors.first().map(|a| a.name.as_str()).unwrap_or("Someone");
    match actors.len().saturating_sub(1) {
        0 => first.to_string(),
        1 => format!("{} and 1 other", first),
        n => format!("{} and {} others", first, n),
    }
}

fn group_message(group: &ActivityGroup) -> String {
    let who = actor_phrase(&group.actors);
    let quoted = |fallback: &str| {
        group
            .target_name
            .as_ref()
            .map(|name| format!("\"{}\"", name))
            .unwrap_or_else(|| fallback.to_string())
    };
    match group.activity_type {
        ActivityType::RecipeCreate => format!("{} shared {}", who, quoted("a recipe")),
        ActivityType::RecipeLike => format!("{} liked {}", who, quoted("a recipe")),
        ActivityType::RecipeComment => format!("{} commented on {}", who, quoted("a recipe")),
        ActivityType::CookbookCreate => format!("{} created {}", who, quoted("a cookbook")),
        ActivityType::CookbookAddRecipe => {
            format!("{} added recipes to {}", who, quoted("a cookbook"))
        }
        ActivityType::UserFollow => format!(
            "{} started following {}",
            who,
            group.target_name.as_deref().unwrap_or("someone")
        ),
        ActivityType::UserMention => format!(
            "{} mentioned {}",
            who,
            group.target_name.as_deref().unwrap_or("someone")
        ),
    }
}
