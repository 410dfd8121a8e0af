// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::api::AppState;
use crate::error::ApiResult;
use crate::services::account::{self, AuthResponse, LoginRequest, RegisterRequest};

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    debug!("Registering {}", request.email);
    let response = account::register(state.store.as_ref(), &state.sessions, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    debug!("Login attempt for {}", request.email);
    let response = account::login(state.store.as_ref(), &state.sessions, request).await?;
    Ok(Json(response))
}
