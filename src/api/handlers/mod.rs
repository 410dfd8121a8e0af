// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod account;
pub mod activity;
pub mod auth;
pub mod comments;
pub mod cookbooks;
pub mod health;
pub mod meal_plans;
pub mod notifications;
pub mod recipes;
pub mod users;

use serde::{Deserialize, Serialize};

use crate::services::Page;

/// Pagination parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// Body for mutations that have nothing else to return
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
