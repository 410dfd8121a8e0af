// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{add_to_set, pull};

/// A registered user with its follow/block relationship arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub cover_image: Option<String>,
    pub bio: Option<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub blocked_users: Vec<Uuid>,
    pub notification_preferences: NotificationPreferences,
    pub privacy_preferences: PrivacyPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
}

/// Profile fields a user may change; `None` leaves the field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub cover_image: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == ProfileChanges::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub recipes: i64,
    pub followers: i64,
    pub following: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub new_follower: bool,
    pub new_comment: bool,
    pub recipe_likes: bool,
    pub newsletter: bool,
    pub push_new_follower: bool,
    pub push_new_comment: bool,
    pub push_recipe_likes: bool,
    pub push_mentions: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            new_follower: true,
            new_comment: true,
            recipe_likes: false,
            newsletter: true,
            push_new_follower: true,
            push_new_comment: true,
            push_recipe_likes: true,
            push_mentions: true,
        }
    }
}

impl NotificationPreferences {
    /// Set a flag by its wire name. Returns false for unknown names.
    pub fn set(&mut self, key: &str, enabled: bool) -> bool {
        let slot = match key {
            "new_follower" => &mut self.new_follower,
            "new_comment" => &mut self.new_comment,
            "recipe_likes" => &mut self.recipe_likes,
            "newsletter" => &mut self.newsletter,
            "push_new_follower" => &mut self.push_new_follower,
            "push_new_comment" => &mut self.push_new_comment,
            "push_recipe_likes" => &mut self.push_recipe_likes,
            "push_mentions" => &mut self.push_mentions,
            _ => return false,
        };
        *slot = enabled;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyPreferences {
    pub profile_visibility: bool,
    pub recipe_visibility: bool,
    pub show_email: bool,
    pub allow_mentions: bool,
    pub show_activity: bool,
    pub personalized_content: bool,
    pub analytics: bool,
    pub third_party_sharing: bool,
}

impl Default for PrivacyPreferences {
    fn default() -> Self {
        Self {
            profile_visibility: true,
            recipe_visibility: true,
            show_email: false,
            allow_mentions: true,
            show_activity: true,
            personalized_content: true,
            analytics: true,
            third_party_sharing: false,
        }
    }
}

impl PrivacyPreferences {
    /// Set a flag by its wire name. Returns false for unknown names.
    pub fn set(&mut self, key: &str, enabled: bool) -> bool {
        let slot = match key {
            "profile_visibility" => &mut self.profile_visibility,
            "recipe_visibility" => &mut self.recipe_visibility,
            "show_email" => &mut self.show_email,
            "allow_mentions" => &mut self.allow_mentions,
            "show_activity" => &mut self.show_activity,
            "personalized_content" => &mut self.personalized_content,
            "analytics" => &mut self.analytics,
            "third_party_sharing" => &mut self.third_party_sharing,
            _ => return false,
        };
        *slot = enabled;
        true
    }
}

/// Which preference document a flag lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceGroup {
    Notifications,
    Privacy,
}

impl PreferenceGroup {
    pub fn column(&self) -> &'static str {
        match self {
            PreferenceGroup::Notifications => "notification_preferences",
            PreferenceGroup::Privacy => "privacy_preferences",
        }
    }
}

/// Why a follow/block change was refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipError {
    #[error("Cannot {0} yourself")]
    SelfAction(&'static str),
    #[error("Already following this user")]
    AlreadyFollowing,
    #[error("Not following this user")]
    NotFollowing,
    #[error("User is already blocked")]
    AlreadyBlocked,
    #[error("User is not blocked")]
    NotBlocked,
    #[error("Cannot follow a user you have blocked or who has blocked you")]
    Blocked,
}

impl User {
    pub fn new(new_user: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            image: None,
            cover_image: None,
            bio: None,
            followers: Vec::new(),
            following: Vec::new(),
            blocked_users: Vec::new(),
            notification_preferences: NotificationPreferences::default(),
            privacy_preferences: PrivacyPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_following(&self, user_id: Uuid) -> bool {
        self.following.contains(&user_id)
    }

    pub fn has_blocked(&self, user_id: Uuid) -> bool {
        self.blocked_users.contains(&user_id)
    }

    /// Authors who hide their recipes still see their own
    pub fn recipes_visible_to(&self, viewer_id: Option<Uuid>) -> bool {
        self.privacy_preferences.recipe_visibility || viewer_id == Some(self.id)
    }

    /// Flip one preference flag by wire name; false for unknown names
    pub fn set_preference(&mut self, group: PreferenceGroup, key: &str, enabled: bool) -> bool {
        match group {
            PreferenceGroup::Notifications => self.notification_preferences.set(key, enabled),
            PreferenceGroup::Privacy => self.privacy_preferences.set(key, enabled),
        }
    }

    pub fn stats(&self, recipes: i64) -> UserStats {
        UserStats {
            recipes,
            followers: self.followers.len() as i64,
            following: self.following.len() as i64,
        }
    }

    pub fn apply(&mut self, changes: &ProfileChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(bio) = &changes.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(image) = &changes.image {
            self.image = Some(image.clone());
        }
        if let Some(cover) = &changes.cover_image {
            self.cover_image = Some(cover.clone());
        }
        self.updated_at = now;
    }

    pub fn check_follow(&self, target: &User) -> Result<(), RelationshipError> {
        if self.id == target.id {
            return Err(RelationshipError::SelfAction("follow"));
        }
        if self.has_blocked(target.id) || target.has_blocked(self.id) {
            return Err(RelationshipError::Blocked);
        }
        if self.is_following(target.id) {
            return Err(RelationshipError::AlreadyFollowing);
        }
        Ok(())
    }

    pub fn check_unfollow(&self, target: &User) -> Result<(), RelationshipError> {
        if self.id == target.id {
            return Err(RelationshipError::SelfAction("unfollow"));
        }
        if !self.is_following(target.id) {
            return Err(RelationshipError::NotFollowing);
        }
        Ok(())
    }

    pub fn check_block(&self, target: &User) -> Result<(), RelationshipError> {
        if self.id == target.id {
            return Err(RelationshipError::SelfAction("block"));
        }
        if self.has_blocked(target.id) {
            return Err(RelationshipError::AlreadyBlocked);
        }
        Ok(())
    }

    pub fn check_unblock(&self, target: &User) -> Result<(), RelationshipError> {
        if self.id == target.id {
            return Err(RelationshipError::SelfAction("unblock"));
        }
        if !self.has_blocked(target.id) {
            return Err(RelationshipError::NotBlocked);
        }
        Ok(())
    }
}

/// Write a follow edge on both sides
pub fn follow(follower: &mut User, target: &mut User) -> bool {
    if follower.id == target.id {
        return false;
    }
    let added = add_to_set(&mut follower.following, target.id);
    add_to_set(&mut target.followers, follower.id);
    added
}

/// Remove a follow edge on both sides
pub fn unfollow(follower: &mut User, target: &mut User) -> bool {
    let removed = pull(&mut follower.following, target.id);
    pull(&mut target.followers, follower.id);
    removed
}

/// Block `target` and drop any follow edge between the two users
pub fn block(blocker: &mut User, target: &mut User) -> bool {
    if blocker.id == target.id {
        return false;
    }
    let added = add_to_set(&mut blocker.blocked_users, target.id);
    unfollow(blocker, target);
    unfollow(target, blocker);
    added
}

pub fn unblock(blocker: &mut User, target_id: Uuid) -> bool {
    pull(&mut blocker.blocked_users, target_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(
            NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn self_actions_are_rejected() {
        let a = user("ana");
        assert_eq!(a.check_follow(&a), Err(RelationshipError::SelfAction("follow")));
        assert_eq!(a.check_block(&a), Err(RelationshipError::SelfAction("block")));
        assert_eq!(
            RelationshipError::SelfAction("block").to_string(),
            "Cannot block yourself"
        );
    }

    #[test]
    fn follow_then_unfollow_restores_both_sides() {
        let mut a = user("ana");
        let mut b = user("ben");
        let (a_before, b_before) = (a.clone(), b.clone());

        assert!(follow(&mut a, &mut b));
        assert!(a.is_following(b.id));
        assert!(b.followers.contains(&a.id));
        assert_eq!(a.check_follow(&b), Err(RelationshipError::AlreadyFollowing));

        assert!(unfollow(&mut a, &mut b));
        assert_eq!(a.following, a_before.following);
        assert_eq!(a.followers, a_before.followers);
        assert_eq!(b.following, b_before.following);
        assert_eq!(b.followers, b_before.followers);
    }

    #[test]
    fn block_removes_mutual_follow() {
        let mut a = user("ana");
        let mut b = user("ben");
        follow(&mut a, &mut b);
        follow(&mut b, &mut a);

        assert!(block(&mut a, &mut b));
        assert!(a.following.is_empty() && a.followers.is_empty());
        assert!(b.following.is_empty() && b.followers.is_empty());
        assert!(a.has_blocked(b.id));
        assert_eq!(b.check_follow(&a), Err(RelationshipError::Blocked));
        assert_eq!(a.check_block(&b), Err(RelationshipError::AlreadyBlocked));

        assert!(unblock(&mut a, b.id));
        assert_eq!(a.check_unblock(&b), Err(RelationshipError::NotBlocked));
    }

    #[test]
    fn preference_keys() {
        let mut notifications = NotificationPreferences::default();
        assert!(!notifications.recipe_likes);
        assert!(notifications.set("recipe_likes", true));
        assert!(notifications.recipe_likes);
        assert!(!notifications.set("sms", true));

        let mut privacy = PrivacyPreferences::default();
        assert!(privacy.set("show_email", true));
        assert!(privacy.show_email);
        assert!(!privacy.set("unknown", false));
    }

    #[test]
    fn hidden_recipes_stay_visible_to_their_author() {
        let mut a = user("ana");
        let b = user("ben");
        assert!(a.set_preference(PreferenceGroup::Privacy, "recipe_visibility", false));
        assert!(!a.recipes_visible_to(Some(b.id)));
        assert!(!a.recipes_visible_to(None));
        assert!(a.recipes_visible_to(Some(a.id)));
        assert!(!a.set_preference(PreferenceGroup::Notifications, "recipe_visibility", false));
    }
}
