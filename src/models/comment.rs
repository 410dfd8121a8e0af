// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{ValidationIssue, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub recipe_id: Uuid,
    /// Set for replies
    pub parent_id: Option<Uuid>,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentDraft {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Users tagged in the comment
    #[serde(default)]
    pub mentions: Vec<Uuid>,
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut v = Validator::new();
        let content = self.content.trim();
        v.check(!content.is_empty(), "content", "Comment content is required");
        v.check(
            content.chars().count() <= 1000,
            "content",
            "Comment cannot be longer than 1000 characters",
        );
        v.finish()
    }
}

impl Comment {
    pub fn new(draft: CommentDraft, author_id: Uuid, recipe_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: draft.content.trim().to_string(),
            author_id,
            recipe_id,
            parent_id: draft.parent_id,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.likes.contains(&user_id)
    }
}

/// Ids of `root` and every reply below it, in breadth-first order
pub fn thread_ids(root: Uuid, comments: &[Comment]) -> Vec<Uuid> {
    let mut ids = vec![root];
    let mut cursor = 0;
    while cursor < ids.len() {
        let parent = ids[cursor];
        for comment in comments {
            if comment.parent_id == Some(parent) && !ids.contains(&comment.id) {
                ids.push(comment.id);
            }
        }
        cursor += 1;
    }
    ids
}
