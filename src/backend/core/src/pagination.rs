//! Offset-based pagination for list endpoints.
//!
//! Parameters arrive as `page`/`per_page` query values; the store renders
//! them into `LIMIT`/`OFFSET` and every list response carries a
//! [`PageMetadata`] computed from the scoped total count, so clients never
//! see counts inflated by rows that scoping filtered out.

use serde::{Deserialize, Serialize};

use crate::error::ForgeError;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// Page Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata about a paginated result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Current page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub per_page: u64,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether there is a previous page.
    pub has_previous: bool,
    /// Whether there is a next page.
    pub has_next: bool,
}

impl PageMetadata {
    /// Create page metadata from pagination parameters and total count.
    pub fn new(page: u64, per_page: u64, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(per_page)
        };

        let page = page.clamp(1, total_pages.max(1));

        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Offset Pagination
// ═══════════════════════════════════════════════════════════════════════════════

/// Offset-based pagination parameters, deserializable straight from query
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    /// Current page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl OffsetPagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Get the SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    /// Get the SQL LIMIT value.
    pub fn limit(&self) -> u64 {
        self.per_page
    }

    /// Create page metadata from a total count.
    pub fn metadata(&self, total_items: u64) -> PageMetadata {
        PageMetadata::new(self.page, self.per_page, total_items)
    }

    /// Validate the raw query parameters.
    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.page < 1 {
            return Err(ForgeError::validation("page must be at least 1"));
        }
        if self.per_page < 1 {
            return Err(ForgeError::validation("per_page must be at least 1"));
        }
        if self.per_page > MAX_PAGE_SIZE {
            return Err(ForgeError::validation(format!(
                "per_page cannot exceed {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

impl Default for OffsetPagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}
