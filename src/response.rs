use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination block returned next to every paged list.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub page_count: u64,
}

impl PageMeta {
    pub fn new(page: &PageRequest, total: u64) -> Self {
        Self {
            total,
            page: page.page,
            page_size: page.page_size,
            page_count: total.div_ceil(page.page_size),
        }
    }
}

/// A validated page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// `limit` wins over `page_size` when both are present.
    pub fn from_query(page: Option<i64>, page_size: Option<i64>, limit: Option<i64>) -> AppResult<Self> {
        let page = match page {
            None => 1,
            Some(p) if p > 0 => p as u64,
            Some(_) => return Err(AppError::validation("page must be a positive integer")),
        };
        let page_size = match limit.or(page_size) {
            None => DEFAULT_PAGE_SIZE,
            Some(s) if s > 0 => (s as u64).min(MAX_PAGE_SIZE),
            Some(_) => return Err(AppError::validation("pageSize must be a positive integer")),
        };
        // The row offset has to fit a Postgres BIGINT.
        let in_range = (page - 1)
            .checked_mul(page_size)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(AppError::validation("page is out of range"));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
