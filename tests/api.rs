// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use recipe_social::api::{build_router, rate_limit::RateLimit, AppState};
use recipe_social::auth::SessionKeys;
use recipe_social::store::{MemoryStore, Store};

const PASSWORD: &str = "Sup3r$ecret";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

struct Account {
    id: Uuid,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), SessionKeys::new("integration-secret", 1));
        Self {
            router: build_router(state),
            store,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(&self, name: &str) -> Account {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        Account {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    async fn create_recipe(&self, author: &Account, title: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/recipes",
                Some(&author.token),
                Some(json!({
                    "title": title,
                    "ingredients": [{"item": "Rice noodles", "amount": "200", "unit": "g"}],
                    "steps": [{"description": "Soak the noodles"}],
                    "difficulty": "medium",
                    "prep_time": 15,
                    "cook_time": 10,
                    "servings": 2,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

#[test_log::test(tokio::test)]
async fn cannot_follow_or_block_yourself() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let own = format!("/api/users/{}", ana.id);

    let (status, body) = app.send(Method::POST, &format!("{}/follow", own), Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot follow yourself");

    let (status, _) = app.send(Method::POST, &format!("{}/block", own), Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test_log::test(tokio::test)]
async fn follow_then_unfollow_restores_both_sides() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let ben = app.register("Ben").await;
    let before_ana = app.store.get_user(ana.id).await.unwrap().unwrap();
    let before_ben = app.store.get_user(ben.id).await.unwrap().unwrap();

    let uri = format!("/api/users/{}/follow", ben.id);
    let (status, _) = app.send(Method::POST, &uri, Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = app.send(Method::GET, &format!("/api/users/{}", ben.id), Some(&ana.token), None).await;
    assert_eq!(profile["is_following"], true);
    assert_eq!(profile["stats"]["followers"], 1);

    let (status, body) = app.send(Method::POST, &uri, Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already following this user");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let after_ana = app.store.get_user(ana.id).await.unwrap().unwrap();
    let after_ben = app.store.get_user(ben.id).await.unwrap().unwrap();
    assert_eq!(after_ana.following, before_ana.following);
    assert_eq!(after_ana.followers, before_ana.followers);
    assert_eq!(after_ben.following, before_ben.following);
    assert_eq!(after_ben.followers, before_ben.followers);
}

#[test_log::test(tokio::test)]
async fn blocking_removes_mutual_follow() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let ben = app.register("Ben").await;
    app.send(Method::POST, &format!("/api/users/{}/follow", ben.id), Some(&ana.token), None).await;
    app.send(Method::POST, &format!("/api/users/{}/follow", ana.id), Some(&ben.token), None).await;

    let (status, _) = app
        .send(Method::POST, &format!("/api/users/{}/block", ben.id), Some(&ana.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let ana_row = app.store.get_user(ana.id).await.unwrap().unwrap();
    let ben_row = app.store.get_user(ben.id).await.unwrap().unwrap();
    assert!(ana_row.following.is_empty() && ana_row.followers.is_empty());
    assert!(ben_row.following.is_empty() && ben_row.followers.is_empty());
    assert_eq!(ana_row.blocked_users, vec![ben.id]);

    // ben cannot follow back while blocked
    let (status, _) = app
        .send(Method::POST, &format!("/api/users/{}/follow", ana.id), Some(&ben.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test_log::test(tokio::test)]
async fn bio_with_links_or_markup_is_rejected() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;

    for bio in ["my blog: http://x.example", "www.example.com", "<script>", "{{name}}"] {
        let (status, body) = app
            .send(Method::PATCH, "/api/user", Some(&ana.token), Some(json!({ "bio": bio })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {:?}", bio);
        assert_eq!(body["issues"][0]["path"], "bio");
    }

    let (status, body) = app
        .send(Method::PATCH, "/api/user", Some(&ana.token), Some(json!({ "bio": " I bake bread " })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "I bake bread");
}

#[test_log::test(tokio::test)]
async fn password_change_requires_the_current_password() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/user/change-password",
            Some(&ana.token),
            Some(json!({ "current_password": "Wr0ng$pass", "new_password": "N3w$ecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/user/change-password",
            Some(&ana.token),
            Some(json!({ "currentPassword": PASSWORD, "newPassword": "N3w$ecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "N3w$ecret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn mutations_require_a_session() {
    let app = TestApp::new();
    let id = Uuid::new_v4();
    let cases = [
        (Method::POST, format!("/api/users/{}/follow", id)),
        (Method::DELETE, format!("/api/users/{}/block", id)),
        (Method::PATCH, "/api/user".to_string()),
        (Method::DELETE, "/api/user".to_string()),
        (Method::POST, "/api/user/change-password".to_string()),
        (Method::POST, "/api/recipes".to_string()),
        (Method::POST, format!("/api/recipes/{}/like", id)),
        (Method::POST, "/api/cookbooks".to_string()),
        (Method::POST, "/api/meal-plans".to_string()),
        (Method::GET, "/api/activity".to_string()),
        (Method::PUT, "/api/notifications".to_string()),
    ];

    for (method, uri) in cases {
        let (status, body) = app.send(method.clone(), &uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "Not authenticated");
    }

    let (status, _) = app
        .send(Method::POST, &format!("/api/users/{}/follow", id), Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn acting_on_your_own_content_sends_no_notifications() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let recipe = app.create_recipe(&ana, "Pad Thai").await;
    let recipe_id = recipe["id"].as_str().unwrap();

    // ana opts into like notifications, then likes and comments on her own recipe
    app.send(
        Method::POST,
        "/api/user/notification-preferences",
        Some(&ana.token),
        Some(json!({ "preference_id": "recipe_likes", "enabled": true })),
    )
    .await;
    app.send(Method::POST, &format!("/api/recipes/{}/like", recipe_id), Some(&ana.token), None).await;
    app.send(
        Method::POST,
        &format!("/api/recipes/{}/comments", recipe_id),
        Some(&ana.token),
        Some(json!({ "content": "Needs more lime" })),
    )
    .await;

    let (status, body) = app.send(Method::GET, "/api/notifications", Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications"], json!([]));
    assert_eq!(body["unread"], 0);
}

#[test_log::test(tokio::test)]
async fn notifications_are_listed_marked_and_deleted() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let ben = app.register("Ben").await;
    app.send(Method::POST, &format!("/api/users/{}/follow", ana.id), Some(&ben.token), None).await;

    let (_, body) = app.send(Method::GET, "/api/notifications", Some(&ana.token), None).await;
    assert_eq!(body["unread"], 1);
    assert_eq!(body["notifications"][0]["type"], "follow");
    assert_eq!(body["notifications"][0]["sender"]["name"], "Ben");

    let (status, body) = app
        .send(Method::PUT, "/api/notifications", Some(&ana.token), Some(json!({ "action": "markAllRead" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (status, body) = app.send(Method::DELETE, "/api/notifications", Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = app
        .send(Method::DELETE, "/api/notifications?all=true", Some(&ana.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
}

#[test_log::test(tokio::test)]
async fn deleting_an_account_cleans_up_references() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    let ben = app.register("Ben").await;
    app.send(Method::POST, &format!("/api/users/{}/follow", ben.id), Some(&ana.token), None).await;
    app.send(Method::POST, &format!("/api/users/{}/follow", ana.id), Some(&ben.token), None).await;
    let recipe = app.create_recipe(&ana, "Khao Soi").await;
    let recipe_id = recipe["id"].as_str().unwrap().to_string();
    app.send(Method::POST, &format!("/api/recipes/{}/like", recipe_id), Some(&ben.token), None).await;

    let (status, book) = app
        .send(Method::POST, "/api/cookbooks", Some(&ben.token), Some(json!({ "title": "Noodles" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", book);
    let book_id: Uuid = book["id"].as_str().unwrap().parse().unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/cookbooks/{}/recipes", book_id),
            Some(&ben.token),
            Some(json!({ "recipeId": recipe_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::DELETE, "/api/user", Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::OK);

    // ben's cookbook survives without the deleted recipe
    let book = app.store.get_cookbook(book_id).await.unwrap().unwrap();
    assert!(book.recipes.is_empty());

    let ben_row = app.store.get_user(ben.id).await.unwrap().unwrap();
    assert!(ben_row.followers.is_empty());
    assert!(ben_row.following.is_empty());
    assert!(app.store.get_user(ana.id).await.unwrap().is_none());

    let (status, _) = app.send(Method::GET, &format!("/api/recipes/{}", recipe_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the old session no longer works
    let (status, _) = app.send(Method::GET, "/api/user", Some(&ana.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test)]
async fn huge_page_numbers_return_an_empty_page() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;
    app.create_recipe(&ana, "Khao Soi").await;

    let (status, body) = app
        .send(Method::GET, "/api/activity?page=9223372036854775807&limit=100", Some(&ana.token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = app
        .send(Method::GET, "/api/recipes?page=9223372036854775807&limit=100", None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 1);
}

#[test_log::test(tokio::test)]
async fn rate_limit_applies_per_forwarded_client() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store, SessionKeys::new("integration-secret", 1))
        .with_rate_limit(RateLimit::new(2, Duration::from_secs(60)).unwrap());
    let router = build_router(state);

    let request = |uri: &str, ip: &str| {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = router.clone().oneshot(request("/api/recipes", "198.51.100.4")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-ratelimit-limit"], "2");
    assert_eq!(first.headers()["x-ratelimit-remaining"], "1");
    let reset: i64 = first.headers()["x-ratelimit-reset"].to_str().unwrap().parse().unwrap();
    assert!(reset > 0);

    let second = router.clone().oneshot(request("/api/recipes", "198.51.100.4, 10.0.0.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-ratelimit-remaining"], "0");

    let limited = router.clone().oneshot(request("/api/recipes", "198.51.100.4")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers()["x-ratelimit-remaining"], "0");
    assert!(limited.headers().contains_key(header::RETRY_AFTER));
    let bytes = to_bytes(limited.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 429);

    // other clients and the health check are unaffected
    let other = router.clone().oneshot(request("/api/recipes", "203.0.113.9")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
    let health = router.clone().oneshot(request("/health", "198.51.100.4")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(!health.headers().contains_key("x-ratelimit-limit"));
}

#[test_log::test(tokio::test)]
async fn unknown_activity_filter_is_rejected() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;

    let (status, body) = app
        .send(Method::GET, "/api/activity?filter=gossip", Some(&ana.token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown filter 'gossip'");

    let (status, _) = app
        .send(Method::GET, "/api/activity?filter=social", Some(&ana.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[test_log::test(tokio::test)]
async fn grouped_feed_merges_likes_on_one_recipe() {
    let app = TestApp::new();
    let chef = app.register("Chef").await;
    let viewer = app.register("Viewer").await;
    let recipe = app.create_recipe(&chef, "Pad Thai").await;
    let recipe_id = recipe["id"].as_str().unwrap().to_string();

    for name in ["Ana", "Ben", "Cy"] {
        let fan = app.register(name).await;
        app.send(Method::POST, &format!("/api/users/{}/follow", fan.id), Some(&viewer.token), None)
            .await;
        app.send(Method::POST, &format!("/api/recipes/{}/like", recipe_id), Some(&fan.token), None)
            .await;
    }

    let (status, body) = app
        .send(Method::GET, "/api/activity?filter=recipes&grouped=true", Some(&viewer.token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["activities"].as_array().unwrap().len(), 3);
    assert_eq!(body["pagination"]["total"], 3);

    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["actors"].as_array().unwrap().len(), 3);
    assert_eq!(groups[0]["message"], "Cy and 2 others liked \"Pad Thai\"");
}

#[test_log::test(tokio::test)]
async fn recipe_slugs_are_unique() {
    let app = TestApp::new();
    let ana = app.register("Ana").await;

    let first = app.create_recipe(&ana, "Green Curry").await;
    let second = app.create_recipe(&ana, "Green curry!").await;
    assert_eq!(first["slug"], "green-curry");
    assert_eq!(second["slug"], "green-curry-2");

    let (status, body) = app.send(Method::GET, "/api/recipes/slug/green-curry-2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], second["id"]);
    assert_eq!(body["author"]["name"], "Ana");
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&text).contains("http_requests_total"));
}
