// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::views::{CommentSummary, CookbookSummary, RecipeSummary, UserSummary};
use super::{current_user, Page, Pagination};
use crate::error::ApiResult;
use crate::feed::{group_activities, ActivityGroup, ActivityView};
use crate::models::{Activity, ActivityFilter, ActivityQuery, ActivityScope, User};
use crate::store::Store;

/// Append to the activity log. Failures are logged, not returned.
pub async fn record(store: &dyn Store, activity: Activity) {
    debug!("Recording {} by {}", activity.activity_type, activity.actor_id);
    if let Err(e) = store.insert_activity(&activity).await {
        warn!(
            "Failed to record {} activity for {}: {}",
            activity.activity_type, activity.actor_id, e
        );
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub page: Page,
    pub filter: ActivityFilter,
    pub user_id: Option<Uuid>,
    pub grouped: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub activities: Vec<ActivityView>,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<ActivityGroup>>,
}

/// Build the viewer's feed, or one user's activity when `user_id` is set
pub async fn load_feed(
    store: &dyn Store,
    viewer_id: Uuid,
    request: FeedRequest,
    now: DateTime<Utc>,
) -> ApiResult<FeedResponse> {
    let viewer = current_user(store, viewer_id).await?;
    let query = feed_query(store, &viewer, &request).await?;
    debug!(
        "Loading feed for {} ({:?}, filter {:?}, page {})",
        viewer.id, query.scope, query.filter, request.page.page
    );

    let (activities, total) = store.list_activities(&query).await?;
    let views = populate(store, viewer.id, &activities).await?;
    let groups = request.grouped.then(|| group_activities(&views, now));

    Ok(FeedResponse {
        activities: views,
        pagination: request.page.pagination(total),
        groups,
    })
}

async fn feed_query(
    store: &dyn Store,
    viewer: &User,
    request: &FeedRequest,
) -> ApiResult<ActivityQuery> {
    let (scope, candidates) = match request.user_id {
        Some(user_id) => (ActivityScope::Actor(user_id), vec![user_id]),
        None => {
            let mut actors = viewer.following.clone();
            actors.push(viewer.id);
            (
                ActivityScope::Network { actors: actors.clone(), target_user: viewer.id },
                actors,
            )
        }
    };

    // Users who hide their activity are only visible to themselves
    let exclude_actors = store
        .get_users(&candidates)
        .await?
        .into_iter()
        .filter(|u| u.id != viewer.id && !u.privacy_preferences.show_activity)
        .map(|u| u.id)
        .collect();

    Ok(ActivityQuery {
        scope,
        filter: request.filter,
        exclude_actors,
        offset: request.page.offset(),
        limit: request.page.limit,
    })
}

/// Resolve actors and referenced entities. Activities whose actor is gone or
/// hides activity from the viewer are dropped.
async fn populate(
    store: &dyn Store,
    viewer_id: Uuid,
    activities: &[Activity],
) -> ApiResult<Vec<ActivityView>> {
    let mut user_ids: Vec<Uuid> = activities
        .iter()
        .flat_map(|a| std::iter::once(a.actor_id).chain(a.target_user_id))
        .collect();
    user_ids.sort();
    user_ids.dedup();
    let recipe_ids: Vec<Uuid> = activities.iter().filter_map(|a| a.recipe_id).collect();
    let cookbook_ids: Vec<Uuid> = activities.iter().filter_map(|a| a.cookbook_id).collect();
    let comment_ids: Vec<Uuid> = activities.iter().filter_map(|a| a.comment_id).collect();

    let users: HashMap<Uuid, User> = store
        .get_users(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let recipes: HashMap<Uuid, RecipeSummary> = store
        .get_recipes(&recipe_ids)
        .await?
        .iter()
        .map(|r| (r.id, RecipeSummary::from(r)))
        .collect();
    let cookbooks: HashMap<Uuid, CookbookSummary> = store
        .get_cookbooks(&cookbook_ids)
        .await?
        .iter()
        .map(|c| (c.id, CookbookSummary::from(c)))
        .collect();
    let comments: HashMap<Uuid, CommentSummary> = store
        .get_comments(&comment_ids)
        .await?
        .iter()
        .map(|c| (c.id, CommentSummary::from(c)))
        .collect();

    Ok(activities
        .iter()
        .filter_map(|activity| {
            let actor = users.get(&activity.actor_id)?;
            if actor.id != viewer_id && !actor.privacy_preferences.show_activity {
                return None;
            }
            let mut view = ActivityView::new(activity, UserSummary::from(actor));
            view.recipe = activity.recipe_id.and_then(|id| recipes.get(&id).cloned());
            view.cookbook = activity.cookbook_id.and_then(|id| cookbooks.get(&id).cloned());
            view.comment = activity.comment_id.and_then(|id| comments.get(&id).cloned());
            view.target_user = activity
                .target_user_id
                .and_then(|id| users.get(&id))
                .map(UserSummary::from);
            Some(view)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityType, NewUser, PreferenceGroup};
    use crate::store::MemoryStore;
    use chrono::Duration;

    async fn user(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                name: name.into(),
                email: format!("{}@example.com", name),
                password_hash: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn network_feed_covers_followed_users_and_self() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let friend = user(&store, "friend").await;
        let stranger = user(&store, "stranger").await;
        store.add_follow(me.id, friend.id).await.unwrap();

        let now = Utc::now();
        for (actor, minutes) in [(me.id, 3), (friend.id, 2), (stranger.id, 1)] {
            record(
                &store,
                Activity::new(actor, ActivityType::CookbookCreate, now - Duration::minutes(minutes)),
            )
            .await;
        }
        // aimed at me by someone I do not follow
        record(
            &store,
            Activity::new(stranger.id, ActivityType::UserFollow, now).with_target_user(me.id),
        )
        .await;

        let feed = load_feed(&store, me.id, FeedRequest::default(), now).await.unwrap();
        let actors: Vec<Uuid> = feed.activities.iter().map(|a| a.actor.id).collect();
        assert_eq!(actors, vec![stranger.id, friend.id, me.id]);
        assert_eq!(feed.pagination.total, 3);
        assert!(feed.groups.is_none());
    }

    #[tokio::test]
    async fn hidden_activity_is_only_visible_to_its_actor() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let shy = user(&store, "shy").await;
        store.add_follow(me.id, shy.id).await.unwrap();
        store
            .set_preference(shy.id, PreferenceGroup::Privacy, "show_activity", false)
            .await
            .unwrap();
        record(&store, Activity::new(shy.id, ActivityType::CookbookCreate, Utc::now())).await;

        let request = FeedRequest { user_id: Some(shy.id), ..Default::default() };
        let theirs = load_feed(&store, me.id, request.clone(), Utc::now()).await.unwrap();
        assert!(theirs.activities.is_empty());

        let own = load_feed(&store, shy.id, request, Utc::now()).await.unwrap();
        assert_eq!(own.activities.len(), 1);
    }

    #[tokio::test]
    async fn filter_and_grouping() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let now = Utc::now();
        record(&store, Activity::new(me.id, ActivityType::CookbookCreate, now)).await;
        record(&store, Activity::new(me.id, ActivityType::RecipeCreate, now)).await;

        let request = FeedRequest {
            filter: ActivityFilter::Cookbooks,
            grouped: true,
            ..Default::default()
        };
        let feed = load_feed(&store, me.id, request, now).await.unwrap();
        assert_eq!(feed.activities.len(), 1);
        assert_eq!(feed.activities[0].activity_type, ActivityType::CookbookCreate);
        assert_eq!(feed.groups.map(|g| g.len()), Some(1));
    }
}
