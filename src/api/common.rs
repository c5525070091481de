//! Common API utilities and shared types
//!
//! Query types shared by several endpoints.

use serde::Deserialize;

use crate::models::ListParams;
use crate::services::table::SortDirection;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for admin APIs
pub fn default_per_page() -> u32 {
    20
}

/// Pagination query parameters; `per_page` falls back to the site setting
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    pub fn params(&self, default_per_page: u32) -> ListParams {
        ListParams::new(self.page, self.per_page.unwrap_or(default_per_page))
    }
}

/// Admin pagination query parameters
#[derive(Debug, Deserialize)]
pub struct AdminPaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl AdminPaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// `?sort=<column>&dir=asc|desc` for sortable tables
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

impl SortQuery {
    /// Column to sort by, ignoring blanks
    pub fn column(&self) -> Option<&str> {
        self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// A column without a direction sorts ascending
    pub fn direction(&self) -> SortDirection {
        match (self.column(), self.dir.as_deref()) {
            (None, _) => SortDirection::Unsorted,
            (Some(_), None) => SortDirection::Ascending,
            (Some(_), Some(dir)) => SortDirection::parse(dir),
        }
    }
}
