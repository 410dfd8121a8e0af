// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::AuthSession;
use crate::error::{ApiResult, AppError};
use crate::models::ActivityFilter;
use crate::services::activity::{self, FeedRequest, FeedResponse};
use crate::services::Page;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub filter: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub grouped: bool,
}

impl ActivityParams {
    fn into_request(self) -> ApiResult<FeedRequest> {
        let filter = match self.filter.as_deref() {
            None | Some("") => ActivityFilter::All,
            Some(raw) => raw.parse::<ActivityFilter>().map_err(|e| {
                warn!("Rejected activity filter '{}'", raw);
                AppError::bad_request(e)
            })?,
        };
        Ok(FeedRequest {
            page: Page::new(self.page, self.limit),
            filter,
            user_id: self.user_id,
            grouped: self.grouped,
        })
    }
}

/// Activity feed of the signed-in user, or of `userId`
pub async fn get_activity(
    State(state): State<AppState>,
    session: AuthSession,
    Query(params): Query<ActivityParams>,
) -> ApiResult<Json<FeedResponse>> {
    debug!("Activity feed for {}: {:?}", session.user_id, params);
    let request = params.into_request()?;
    let feed = activity::load_feed(state.store.as_ref(), session.user_id, request, Utc::now()).await?;
    Ok(Json(feed))
}
