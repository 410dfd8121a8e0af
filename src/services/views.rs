// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Response shapes embedded in feeds, notifications and listings.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Comment, Cookbook, Recipe, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            slug: recipe.slug.clone(),
            image: recipe.cover_image().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookbookSummary {
    pub id: Uuid,
    pub title: String,
    pub cover_image: Option<String>,
}

impl From<&Cookbook> for CookbookSummary {
    fn from(cookbook: &Cookbook) -> Self {
        Self {
            id: cookbook.id,
            title: cookbook.title.clone(),
            cover_image: cookbook.cover_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentSummary {
    pub id: Uuid,
    pub content: String,
}

impl From<&Comment> for CommentSummary {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content.clone(),
        }
    }
}
