// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::{ValidationIssue, Validator};

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: String,
    pub amount: String,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub media: Vec<Media>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    /// Minutes
    pub prep_time: i32,
    /// Minutes
    pub cook_time: i32,
    pub servings: i32,
    pub author_id: Uuid,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-supplied recipe fields, used for both create and replace
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
}

/// Listing filter for recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub author_id: Option<Uuid>,
    pub tag: Option<String>,
    /// Recipes of authors with `recipe_visibility` off are only listed for themselves
    pub viewer_id: Option<Uuid>,
    pub offset: i64,
    pub limit: i64,
}

/// Derive a URL slug: lower-case, strip punctuation, hyphenate whitespace
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&stripped, "-").into_owned()
}

impl RecipeDraft {
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut v = Validator::new();
        v.length(self.title.trim(), "title", 3, 100, "Title");
        for (i, ingredient) in self.ingredients.iter().enumerate() {
            v.check(
                !ingredient.item.trim().is_empty(),
                &format!("ingredients.{}.item", i),
                "Ingredient name is required",
            );
            v.check(
                !ingredient.amount.trim().is_empty(),
                &format!("ingredients.{}.amount", i),
                "Amount is required",
            );
        }
        for (i, step) in self.steps.iter().enumerate() {
            v.check(
                !step.description.trim().is_empty(),
                &format!("steps.{}.description", i),
                "Step description is required",
            );
            if let Some(url) = &step.image_url {
                v.url(url, &format!("steps.{}.image_url", i));
            }
        }
        for (i, media) in self.media.iter().enumerate() {
            v.url(&media.url, &format!("media.{}.url", i));
        }
        v.check(self.prep_time >= 1, "prep_time", "Preparation time must be at least 1 minute");
        v.check(self.cook_time >= 1, "cook_time", "Cooking time must be at least 1 minute");
        v.check(self.servings >= 1, "servings", "Must serve at least 1 person");
        v.finish()
    }
}

impl Recipe {
    /// Build a recipe from a validated draft
    pub fn from_draft(draft: RecipeDraft, slug: String, author_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut recipe = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            slug,
            description: None,
            ingredients: Vec::new(),
            steps: Vec::new(),
            media: Vec::new(),
            tags: Vec::new(),
            difficulty: draft.difficulty,
            prep_time: 0,
            cook_time: 0,
            servings: 0,
            author_id,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        recipe.replace_with(draft, now);
        recipe
    }

    /// Overwrite the editable fields. The slug is managed by the caller.
    pub fn replace_with(&mut self, draft: RecipeDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_string();
        self.description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.ingredients = draft
            .ingredients
            .into_iter()
            .map(|i| Ingredient {
                item: i.item.trim().to_string(),
                amount: i.amount.trim().to_string(),
                unit: i.unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            })
            .collect();
        self.steps = draft.steps;
        self.media = draft.media;
        self.tags = super::normalize_tags(&draft.tags);
        self.difficulty = draft.difficulty;
        self.prep_time = draft.prep_time;
        self.cook_time = draft.cook_time;
        self.servings = draft.servings;
        self.updated_at = now;
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }

    pub fn likes_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comments_count(&self) -> usize {
        self.comments.len()
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.media
            .iter()
            .find(|m| m.kind == MediaKind::Image)
            .map(|m| m.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str) -> RecipeDraft {
        RecipeDraft {
            title: title.to_string(),
            description: None,
            ingredients: vec![Ingredient {
                item: "Rice noodles".into(),
                amount: "200".into(),
                unit: Some("g".into()),
            }],
            steps: vec![Step {
                description: "Soak the noodles".into(),
                image_url: None,
            }],
            media: vec![],
            tags: vec!["Thai".into()],
            difficulty: Difficulty::Medium,
            prep_time: 15,
            cook_time: 10,
            servings: 2,
        }
    }

    #[test]
    fn slug_derivation() {
        assert_eq!(slugify("Pad Thai"), "pad-thai");
        assert_eq!(slugify("  Mom's   Best Chili!! "), "moms-best-chili");
        assert_eq!(slugify("Crème brûlée"), "crme-brle");
        assert_eq!(slugify("Ünïcödé"), "ncd");
        assert_eq!(slugify("one-pot pasta"), "one-pot-pasta");
    }

    #[test]
    fn draft_validation() {
        assert!(draft("Pad Thai").validate().is_ok());

        let mut bad = draft("Hi");
        bad.servings = 0;
        bad.media.push(Media {
            url: "not a url".into(),
            kind: MediaKind::Image,
            caption: None,
        });
        let issues = bad.validate().unwrap_err();
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["title", "media.0.url", "servings"]);
    }

    #[test]
    fn from_draft_normalizes_fields() {
        let recipe = Recipe::from_draft(draft("  Pad Thai "), "pad-thai".into(), Uuid::new_v4(), Utc::now());
        assert_eq!(recipe.title, "Pad Thai");
        assert_eq!(recipe.tags, vec!["thai"]);
        assert_eq!(recipe.likes_count(), 0);
        assert!(recipe.cover_image().is_none());
    }
}
