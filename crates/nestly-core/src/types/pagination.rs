//! Offset pagination for notification listings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page whose offset still fits a signed 64-bit SQL `OFFSET`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// 1-based page selector. Deserialized values are taken as-is; use
/// [`PageRequest::new`] or [`PageRequest::normalized`] to clamp them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }.normalized()
    }

    /// Page within `1..=MAX_PAGE`, size within `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(1, MAX_PAGE),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Rows to take.
    pub fn limit(&self) -> u64 {
        self.page_size
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

/// One page of results plus enough totals to render a pager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T: Serialize> PageResponse<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_items: u64) -> Self {
        // An empty listing still renders as a single page.
        let total_pages = total_items.div_ceil(page_size.max(1)).max(1);
        Self {
            items,
            page,
            page_size,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }

    /// Page of `items` for `request`.
    pub fn for_request(items: Vec<T>, request: &PageRequest, total_items: u64) -> Self {
        Self::new(items, request.page, request.page_size, total_items)
    }
}
