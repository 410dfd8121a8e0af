// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Follow,
    Like,
    Comment,
    Mention,
    CookbookAdd,
    RecipeSave,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Follow => "follow",
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Mention => "mention",
            NotificationType::CookbookAdd => "cookbook_add",
            NotificationType::RecipeSave => "recipe_save",
        }
    }

    /// Short text shown for a notification from `sender`
    pub fn message(&self, sender: &str) -> String {
        match self {
            NotificationType::Follow => format!("{} started following you", sender),
            NotificationType::Like => format!("{} liked your recipe", sender),
            NotificationType::Comment => format!("{} commented on your recipe", sender),
            NotificationType::Mention => format!("{} mentioned you in a comment", sender),
            NotificationType::CookbookAdd => {
                format!("{} added your recipe to their cookbook", sender)
            }
            NotificationType::RecipeSave => format!("{} saved your recipe", sender),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(NotificationType::Follow),
            "like" => Ok(NotificationType::Like),
            "comment" => Ok(NotificationType::Comment),
            "mention" => Ok(NotificationType::Mention),
            "cookbook_add" => Ok(NotificationType::CookbookAdd),
            "recipe_save" => Ok(NotificationType::RecipeSave),
            other => Err(format!("unknown notification type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub read: bool,
    pub recipe_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub cookbook_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been delivered yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub notification_type: NotificationType,
    pub recipe_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub cookbook_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(recipient_id: Uuid, sender_id: Uuid, notification_type: NotificationType) -> Self {
        Self {
            recipient_id,
            sender_id,
            notification_type,
            recipe_id: None,
            comment_id: None,
            cookbook_id: None,
        }
    }

    pub fn recipe(mut self, recipe_id: Uuid) -> Self {
        self.recipe_id = Some(recipe_id);
        self
    }

    pub fn comment(mut self, comment_id: Uuid) -> Self {
        self.comment_id = Some(comment_id);
        self
    }

    pub fn cookbook(mut self, cookbook_id: Uuid) -> Self {
        self.cookbook_id = Some(cookbook_id);
        self
    }

    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_id: self.recipient_id,
            sender_id: self.sender_id,
            notification_type: self.notification_type,
            read: false,
            recipe_id: self.recipe_id,
            comment_id: self.comment_id,
            cookbook_id: self.cookbook_id,
            created_at: now,
        }
    }
}
