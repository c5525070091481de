//! Paging types shared by every list query

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page, 1..=100
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Row offset for SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let total = u64::try_from(self.total).unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);

        let params = ListParams::new(3, 0);
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_total_pages() {
        let params = ListParams::new(1, 10);
        assert_eq!(PagedResult::<i32>::new(vec![], 0, &params).total_pages(), 0);
        assert_eq!(PagedResult::<i32>::new(vec![], 10, &params).total_pages(), 1);
        assert_eq!(PagedResult::<i32>::new(vec![], 11, &params).total_pages(), 2);
    }

    #[test]
    fn test_has_next_prev() {
        let result = PagedResult::<i32>::new(vec![], 25, &ListParams::new(2, 10));
        assert!(result.has_next());
        assert!(result.has_prev());

        let last = PagedResult::<i32>::new(vec![], 25, &ListParams::new(3, 10));
        assert!(!last.has_next());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn property_pages_cover_total(total in 0i64..10_000, per_page in 1u32..=100) {
            let result = PagedResult::<()>::new(vec![], total, &ListParams::new(1, per_page));
            let pages = i64::from(result.total_pages());
            prop_assert!(pages * i64::from(per_page) >= total);
            prop_assert!(pages == 0 || (pages - 1) * i64::from(per_page) < total);
        }
    }
}
