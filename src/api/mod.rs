// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

mod handlers;
pub mod rate_limit;

use crate::auth::SessionKeys;
use crate::config::Config;
use crate::metrics::{metrics_handler, track_requests};
use crate::store::Store;
use anyhow::Result;
use rate_limit::RateLimit;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionKeys>,
    /// Applied to `/api` routes when present
    pub rate_limit: Option<Arc<RateLimit>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: SessionKeys) -> Self {
        Self {
            store,
            sessions: Arc::new(sessions),
            rate_limit: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(Arc::new(rate_limit));
        self
    }
}

/// Every route of the API, without CORS
pub fn build_router(state: AppState) -> Router {
    let mut api = api_routes();
    if let Some(limiter) = state.rate_limit.clone() {
        api = api.layer(middleware::from_fn_with_state(limiter, rate_limit::rate_limit));
    }

    Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(metrics_handler))
        .merge(api)

        // Add state and middleware
        .with_state(state)
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Sessions
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))

        // Own account
        .route(
            "/api/user",
            get(handlers::account::get_account)
                .patch(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route("/api/user/change-password", post(handlers::account::change_password))
        .route(
            "/api/user/notification-preferences",
            post(handlers::account::set_notification_preference),
        )
        .route(
            "/api/user/privacy-preferences",
            post(handlers::account::set_privacy_preference),
        )
        .route("/api/user/data-export", post(handlers::account::export_data))

        // Profiles and relationships
        .route("/api/users/:id", get(handlers::users::get_profile))
        .route("/api/users/:id/followers", get(handlers::users::get_followers))
        .route("/api/users/:id/following", get(handlers::users::get_following))
        .route(
            "/api/users/:id/follow",
            post(handlers::users::follow).delete(handlers::users::unfollow),
        )
        .route(
            "/api/users/:id/block",
            post(handlers::users::block).delete(handlers::users::unblock),
        )

        // Recipes and comments
        .route(
            "/api/recipes",
            get(handlers::recipes::list_recipes).post(handlers::recipes::create_recipe),
        )
        .route("/api/recipes/slug/:slug", get(handlers::recipes::get_recipe_by_slug))
        .route(
            "/api/recipes/:id",
            get(handlers::recipes::get_recipe)
                .put(handlers::recipes::update_recipe)
                .delete(handlers::recipes::delete_recipe),
        )
        .route(
            "/api/recipes/:id/like",
            post(handlers::recipes::like_recipe).delete(handlers::recipes::unlike_recipe),
        )
        .route(
            "/api/recipes/:id/comments",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route("/api/comments/:id", delete(handlers::comments::delete_comment))
        .route(
            "/api/comments/:id/like",
            post(handlers::comments::like_comment).delete(handlers::comments::unlike_comment),
        )

        // Cookbooks
        .route(
            "/api/cookbooks",
            get(handlers::cookbooks::list_cookbooks).post(handlers::cookbooks::create_cookbook),
        )
        .route(
            "/api/cookbooks/:id",
            get(handlers::cookbooks::get_cookbook)
                .put(handlers::cookbooks::update_cookbook)
                .delete(handlers::cookbooks::delete_cookbook),
        )
        .route("/api/cookbooks/:id/recipes", post(handlers::cookbooks::add_recipe))
        .route(
            "/api/cookbooks/:id/recipes/:recipe_id",
            delete(handlers::cookbooks::remove_recipe),
        )
        .route(
            "/api/cookbooks/:id/collaborators",
            post(handlers::cookbooks::add_collaborator),
        )
        .route(
            "/api/cookbooks/:id/collaborators/:user_id",
            delete(handlers::cookbooks::remove_collaborator),
        )

        // Meal plans
        .route(
            "/api/meal-plans",
            get(handlers::meal_plans::list_meal_plans).post(handlers::meal_plans::create_meal_plan),
        )
        .route(
            "/api/meal-plans/:id",
            get(handlers::meal_plans::get_meal_plan).delete(handlers::meal_plans::delete_meal_plan),
        )
        .route("/api/meal-plans/:id/meals", post(handlers::meal_plans::add_meal))
        .route("/api/meal-plans/:id/grocery", post(handlers::meal_plans::add_grocery_item))
        .route(
            "/api/meal-plans/:id/grocery/:index",
            patch(handlers::meal_plans::toggle_grocery_item),
        )

        // Feed and notifications
        .route("/api/activity", get(handlers::activity::get_activity))
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications)
                .put(handlers::notifications::mark_read)
                .delete(handlers::notifications::delete_notifications),
        )
}

/// Start the API server and serve until `shutdown` resolves
pub async fn start_api_server(
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let config = Config::get();

    let mut app = build_router(state);
    if config.server.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    // Get bind address
    let addr = format!("{}:{}", config.server.host, config.server.port).parse::<SocketAddr>()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Starting API server on {}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("API server stopped with error: {}", e);
        return Err(e.into());
    }

    info!("API server stopped");
    Ok(())
}
