// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Cross-entity rules sitting between the HTTP handlers and the store.

pub mod account;
pub mod activity;
pub mod cookbooks;
pub mod meal_plans;
pub mod notifications;
pub mod profile;
pub mod recipes;
pub mod relationships;
pub mod views;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::models::User;
use crate::store::Store;

/// Resolved page/limit pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Page defaults to 1; limit defaults to 20 and is clamped to 1..=100
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip; saturates for absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            total,
            page: self.page,
            limit: self.limit,
            pages: (total + self.limit - 1) / self.limit,
        }
    }

    /// Slice an in-memory list
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

/// The signed-in user's record; a session for a deleted account is no session
pub async fn current_user(store: &dyn Store, user_id: Uuid) -> ApiResult<User> {
    store
        .get_user(user_id)
        .await?
        .ok_or(AppError::Unauthenticated)
}

pub async fn require_user(store: &dyn Store, user_id: Uuid) -> ApiResult<User> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamping() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 20 });
        assert_eq!(Page::new(Some(0), Some(500)), Page { page: 1, limit: 100 });
        assert_eq!(Page::new(Some(3), Some(0)), Page { page: 3, limit: 1 });
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.offset(), i64::MAX);
        assert!(page.slice(&[1, 2, 3]).is_empty());
        assert_eq!(page.pagination(3).pages, 1);
    }

    #[test]
    fn page_count_rounds_up() {
        let page = Page::new(Some(1), Some(20));
        assert_eq!(page.pagination(0).pages, 0);
        assert_eq!(page.pagination(20).pages, 1);
        assert_eq!(page.pagination(21).pages, 2);
    }
}
