// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kinds of user actions recorded for feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    RecipeCreate,
    RecipeLike,
    RecipeComment,
    CookbookCreate,
    CookbookAddRecipe,
    UserFollow,
    UserMention,
}

/// What an activity is about, for grouping purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Recipe,
    Cookbook,
    User,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::RecipeCreate,
        ActivityType::RecipeLike,
        ActivityType::RecipeComment,
        ActivityType::CookbookCreate,
        ActivityType::CookbookAddRecipe,
        ActivityType::UserFollow,
        ActivityType::UserMention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::RecipeCreate => "recipe_create",
            ActivityType::RecipeLike => "recipe_like",
            ActivityType::RecipeComment => "recipe_comment",
            ActivityType::CookbookCreate => "cookbook_create",
            ActivityType::CookbookAddRecipe => "cookbook_add_recipe",
            ActivityType::UserFollow => "user_follow",
            ActivityType::UserMention => "user_mention",
        }
    }

    pub fn target_kind(&self) -> TargetKind {
        match self {
            ActivityType::RecipeCreate | ActivityType::RecipeLike | ActivityType::RecipeComment => {
                TargetKind::Recipe
            }
            ActivityType::CookbookCreate | ActivityType::CookbookAddRecipe => TargetKind::Cookbook,
            ActivityType::UserFollow | ActivityType::UserMention => TargetKind::User,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown activity type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub actor_id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub recipe_id: Option<Uuid>,
    pub cookbook_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(actor_id: Uuid, activity_type: ActivityType, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            activity_type,
            recipe_id: None,
            cookbook_id: None,
            comment_id: None,
            target_user_id: None,
            created_at,
        }
    }

    pub fn with_recipe(mut self, recipe_id: Uuid) -> Self {
        self.recipe_id = Some(recipe_id);
        self
    }

    pub fn with_cookbook(mut self, cookbook_id: Uuid) -> Self {
        self.cookbook_id = Some(cookbook_id);
        self
    }

    pub fn with_comment(mut self, comment_id: Uuid) -> Self {
        self.comment_id = Some(comment_id);
        self
    }

    pub fn with_target_user(mut self, user_id: Uuid) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    /// The referenced entity this activity is about, if recorded
    pub fn target(&self) -> Option<(TargetKind, Uuid)> {
        let kind = self.activity_type.target_kind();
        let id = match kind {
            TargetKind::Recipe => self.recipe_id,
            TargetKind::Cookbook => self.cookbook_id,
            TargetKind::User => self.target_user_id,
        };
        id.map(|id| (kind, id))
    }
}

/// Feed category filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityFilter {
    #[default]
    All,
    Recipes,
    Cookbooks,
    Social,
}

impl ActivityFilter {
    /// Activity types selected by this filter; `None` selects everything
    pub fn types(&self) -> Option<&'static [ActivityType]> {
        match self {
            ActivityFilter::All => None,
            ActivityFilter::Recipes => Some(&[
                ActivityType::RecipeCreate,
                ActivityType::RecipeLike,
                ActivityType::RecipeComment,
            ]),
            ActivityFilter::Cookbooks => {
                Some(&[ActivityType::CookbookCreate, ActivityType::CookbookAddRecipe])
            }
            ActivityFilter::Social => Some(&[ActivityType::UserFollow, ActivityType::UserMention]),
        }
    }

    pub fn matches(&self, activity_type: ActivityType) -> bool {
        self.types().map_or(true, |types| types.contains(&activity_type))
    }
}

impl FromStr for ActivityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ActivityFilter::All),
            "recipes" => Ok(ActivityFilter::Recipes),
            "cookbooks" => Ok(ActivityFilter::Cookbooks),
            "social" => Ok(ActivityFilter::Social),
            other => Err(format!("Unknown filter '{}'", other)),
        }
    }
}

/// Whose activities a feed query covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityScope {
    /// Everything done by one user
    Actor(Uuid),
    /// Done by any of `actors`, or aimed at `target_user`
    Network { actors: Vec<Uuid>, target_user: Uuid },
}

#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub scope: ActivityScope,
    pub filter: ActivityFilter,
    /// Actors whose activity must not appear
    pub exclude_actors: Vec<Uuid>,
    pub offset: i64,
    pub limit: i64,
}

impl ActivityQuery {
    pub fn matches(&self, activity: &Activity) -> bool {
        let in_scope = match &self.scope {
            ActivityScope::Actor(actor) => activity.actor_id == *actor,
            ActivityScope::Network { actors, target_user } => {
                actors.contains(&activity.actor_id)
                    || activity.target_user_id == Some(*target_user)
            }
        };
        in_scope
            && self.filter.matches(activity.activity_type)
            && !self.exclude_actors.contains(&activity.actor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip_through_str() {
        for t in ActivityType::ALL {
            assert_eq!(t.as_str().parse::<ActivityType>().unwrap(), t);
        }
        assert!("recipe_save".parse::<ActivityType>().is_err());
    }

    #[test]
    fn filters_select_by_category() {
        assert!(ActivityFilter::Recipes.matches(ActivityType::RecipeLike));
        assert!(!ActivityFilter::Recipes.matches(ActivityType::CookbookCreate));
        assert!(ActivityFilter::Cookbooks.matches(ActivityType::CookbookAddRecipe));
        assert!(ActivityFilter::Social.matches(ActivityType::UserFollow));
        assert!(ActivityFilter::All.matches(ActivityType::UserMention));
        for t in ActivityType::ALL {
            let categories = [ActivityFilter::Recipes, ActivityFilter::Cookbooks, ActivityFilter::Social];
            assert_eq!(categories.iter().filter(|f| f.matches(t)).count(), 1, "{}", t);
        }
        assert!("everything".parse::<ActivityFilter>().is_err());
    }

    #[test]
    fn target_follows_activity_type() {
        let recipe = Uuid::new_v4();
        let cookbook = Uuid::new_v4();
        let added = Activity::new(Uuid::new_v4(), ActivityType::CookbookAddRecipe, Utc::now())
            .with_recipe(recipe)
            .with_cookbook(cookbook);
        assert_eq!(added.target(), Some((TargetKind::Cookbook, cookbook)));

        let follow = Activity::new(Uuid::new_v4(), ActivityType::UserFollow, Utc::now());
        assert_eq!(follow.target(), None);
    }

    #[test]
    fn network_scope_includes_activity_aimed_at_viewer() {
        let me = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let query = ActivityQuery {
            scope: ActivityScope::Network { actors: vec![me], target_user: me },
            filter: ActivityFilter::All,
            exclude_actors: vec![],
            offset: 0,
            limit: 20,
        };
        let followed_me = Activity::new(stranger, ActivityType::UserFollow, Utc::now()).with_target_user(me);
        let unrelated = Activity::new(stranger, ActivityType::RecipeCreate, Utc::now());
        assert!(query.matches(&followed_me));
        assert!(!query.matches(&unrelated));
    }
}
