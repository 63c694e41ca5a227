//! Page window math for bundle listings.

use serde::{Deserialize, Serialize};

/// Page size used when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 100;

/// Clamp a requested page size into `1..=MAX_LIMIT`.
#[must_use]
pub fn clamp_limit(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Pagination block returned alongside a page of rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Pagination {
    /// Rows matching the filter across all pages.
    pub total: u64,
    /// Page size.
    pub limit: u32,
    /// Rows skipped.
    pub offset: u32,
    /// Whether rows exist past this page.
    pub has_next_page: bool,
    /// Whether rows exist before this page.
    pub has_previous_page: bool,
    /// One-based page number containing `offset`.
    pub current_page: u64,
    /// Number of pages at this page size; `0` when there are no rows.
    pub total_pages: u64,
}

impl Pagination {
    /// Compute the block for `total` rows viewed through `limit`/`offset`.
    ///
    /// `limit` must be non-zero; callers pass it through [`clamp_limit`].
    #[must_use]
    pub fn new(total: u64, limit: u32, offset: u32) -> Self {
        let page = u64::from(limit.max(1));
        let offset_rows = u64::from(offset);
        Self {
            total,
            limit,
            offset,
            has_next_page: offset_rows + page < total,
            has_previous_page: offset > 0,
            current_page: offset_rows / page + 1,
            total_pages: total.div_ceil(page),
        }
    }
}
