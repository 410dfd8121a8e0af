// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{add_to_set, normalize_tags, pull};
use crate::validation::{ValidationIssue, Validator};

/// A named, ordered collection of recipe references
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookbook {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub collaborators: Vec<Uuid>,
    pub recipes: Vec<Uuid>,
    pub cover_image: Option<String>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookbookDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CookbookDraft {
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut v = Validator::new();
        v.length(self.title.trim(), "title", 1, 100, "Title");
        if let Some(description) = &self.description {
            v.length(description.trim(), "description", 0, 500, "Description");
        }
        if let Some(cover) = &self.cover_image {
            v.url(cover, "cover_image");
        }
        for (i, tag) in self.tags.iter().enumerate() {
            v.length(tag.trim(), &format!("tags.{}", i), 0, 30, "Tag");
        }
        v.finish()
    }
}

impl Cookbook {
    pub fn from_draft(draft: CookbookDraft, owner_id: Uuid, now: DateTime<Utc>) -> Self {
        let mut cookbook = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            description: None,
            owner_id,
            collaborators: Vec::new(),
            recipes: Vec::new(),
            cover_image: None,
            is_public: false,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        cookbook.replace_with(draft, now);
        cookbook
    }

    pub fn replace_with(&mut self, draft: CookbookDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_string();
        self.description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self.cover_image = draft.cover_image;
        self.is_public = draft.is_public;
        self.tags = normalize_tags(&draft.tags);
        self.updated_at = now;
    }

    /// Public, or owned by / shared with `user_id`
    pub fn has_access(&self, user_id: Option<Uuid>) -> bool {
        self.is_public || user_id.map_or(false, |id| self.can_edit(id))
    }

    /// Owner and collaborators may change the recipe list
    pub fn can_edit(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.collaborators.contains(&user_id)
    }

    pub fn add_recipe(&mut self, recipe_id: Uuid) -> bool {
        add_to_set(&mut self.recipes, recipe_id)
    }

    pub fn remove_recipe(&mut self, recipe_id: Uuid) -> bool {
        pull(&mut self.recipes, recipe_id)
    }

    pub fn add_collaborator(&mut self, user_id: Uuid) -> bool {
        user_id != self.owner_id && add_to_set(&mut self.collaborators, user_id)
    }

    pub fn remove_collaborator(&mut self, user_id: Uuid) -> bool {
        pull(&mut self.collaborators, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookbook(owner: Uuid, is_public: bool) -> Cookbook {
        Cookbook::from_draft(
            CookbookDraft {
                title: "Weeknight dinners".into(),
                description: Some("  ".into()),
                cover_image: None,
                is_public,
                tags: vec!["Quick".into()],
            },
            owner,
            Utc::now(),
        )
    }

    #[test]
    fn access_rules() {
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let mut private = cookbook(owner, false);
        assert!(private.description.is_none());
        assert!(private.has_access(Some(owner)));
        assert!(!private.has_access(Some(stranger)));
        assert!(!private.has_access(None));

        assert!(private.add_collaborator(friend));
        assert!(!private.add_collaborator(owner));
        assert!(private.has_access(Some(friend)));
        assert!(private.can_edit(friend));

        let public = cookbook(owner, true);
        assert!(public.has_access(None));
        assert!(!public.can_edit(stranger));
    }

    #[test]
    fn recipes_keep_order_without_duplicates() {
        let mut book = cookbook(Uuid::new_v4(), true);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(book.add_recipe(a));
        assert!(book.add_recipe(b));
        assert!(!book.add_recipe(a));
        assert_eq!(book.recipes, vec![a, b]);
        assert!(book.remove_recipe(a));
        assert_eq!(book.recipes, vec![b]);
    }

    #[test]
    fn draft_rejects_long_tags_and_bad_cover() {
        let draft = CookbookDraft {
            title: "Bakes".into(),
            description: None,
            cover_image: Some("ftp://img".into()),
            is_public: false,
            tags: vec!["x".repeat(31)],
        };
        let issues = draft.validate().unwrap_err();
        assert_eq!(issues.len(), 2);
    }
}
