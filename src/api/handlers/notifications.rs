// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::ApiResult;
use crate::services::notifications::{self, MarkReadRequest, NotificationList};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub all: bool,
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    session: AuthSession,
) -> ApiResult<Json<NotificationList>> {
    debug!("Listing notifications for {}", session.user_id);
    Ok(Json(notifications::list(state.store.as_ref(), session.user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<Json<UpdatedResponse>> {
    let updated = notifications::mark_read(state.store.as_ref(), session.user_id, request).await?;
    Ok(Json(UpdatedResponse { updated }))
}

pub async fn delete_notifications(
    State(state): State<AppState>,
    session: AuthSession,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<DeletedResponse>> {
    debug!("Deleting notifications for {}: {:?}", session.user_id, params);
    let deleted =
        notifications::delete(state.store.as_ref(), session.user_id, params.all, params.id).await?;
    Ok(Json(DeletedResponse { deleted }))
}
