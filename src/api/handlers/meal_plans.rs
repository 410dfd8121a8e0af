// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use super::Message;
use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::models::{MealPlan, MealPlanDraft};
use crate::services::meal_plans::{self, AddGroceryRequest, AddMealRequest};

pub async fn list_meal_plans(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<Vec<MealPlan>>> {
    Ok(Json(meal_plans::list_meal_plans(state.store.as_ref(), session.user_id).await?))
}

pub async fn create_meal_plan(
    State(state): State<AppState>,
    session: AuthSession,
    Json(draft): Json<MealPlanDraft>,
) -> ApiResult<(StatusCode, Json<MealPlan>)> {
    let plan = meal_plans::create_meal_plan(state.store.as_ref(), session.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get_meal_plan(
    State(state): State<AppState>,
    session: AuthSession,
    Path(plan_id): Path<Uuid>,
) -> ApiResult<Json<MealPlan>> {
    Ok(Json(meal_plans::get_meal_plan(state.store.as_ref(), session.user_id, plan_id).await?))
}

pub async fn delete_meal_plan(
    State(state): State<AppState>,
    session: AuthSession,
    Path(plan_id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    meal_plans::delete_meal_plan(state.store.as_ref(), session.user_id, plan_id).await?;
    Ok(Json(Message::new("Meal plan deleted successfully")))
}

pub async fn add_meal(
    State(state): State<AppState>,
    session: AuthSession,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<AddMealRequest>,
) -> ApiResult<Json<MealPlan>> {
    debug!("Adding meal to plan {} on {}", plan_id, request.date);
    let plan = meal_plans::add_meal(state.store.as_ref(), session.user_id, plan_id, request).await?;
    Ok(Json(plan))
}

pub async fn add_grocery_item(
    State(state): State<AppState>,
    session: AuthSession,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<AddGroceryRequest>,
) -> ApiResult<Json<MealPlan>> {
    let plan =
        meal_plans::add_grocery_item(state.store.as_ref(), session.user_id, plan_id, request)
            .await?;
    Ok(Json(plan))
}

pub async fn toggle_grocery_item(
    State(state): State<AppState>,
    session: AuthSession,
    Path((plan_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<MealPlan>> {
    let plan =
        meal_plans::toggle_grocery_item(state.store.as_ref(), session.user_id, plan_id, index)
            .await?;
    Ok(Json(plan))
}
