//! Offset pagination types for the unified API
//!
//! The server answers `findManyPaginated` with a `{ data, meta }` envelope.
//! [`PageMeta::from_counts`] derives a consistent meta block when a caller
//! only has a page, a limit and a total.

use serde::{Deserialize, Serialize};

/// Default page size when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Information about the current page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageMeta {
    /// Derive meta from counts. `page` and `limit` are clamped to at least 1.
    pub fn from_counts(page: u32, limit: u32, total_items: u64) -> Self {
        let page = page.max(1);
        let limit = limit.max(1) as u64;
        let total_pages = total_items.div_ceil(limit) as u32;
        Self {
            current_page: page,
            total_pages,
            total_items,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Meta for an empty result on the first page.
    pub fn empty() -> Self {
        Self::from_counts(1, DEFAULT_PAGE_SIZE, 0)
    }
}

/// A page of records with its meta block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PaginatedResult<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            meta: PageMeta::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Page sizes below 1 are raised to 1. There is no upper bound; the server
/// enforces its own.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.max(1)
}
