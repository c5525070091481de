//! Pagination window
//!
//! Computes the compact list of page links shown under post listings:
//! the first and last pages are always present, the current page keeps its
//! immediate neighbours, and gaps collapse into ellipses.

use serde::Serialize;

/// Totals at or below this show every page without ellipses
const FULL_WINDOW_MAX: u32 = 7;

/// One entry of the page bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "page", rename_all = "lowercase")]
pub enum PageMarker {
    Page(u32),
    Ellipsis,
}

impl PageMarker {
    pub fn page(&self) -> Option<u32> {
        match self {
            PageMarker::Page(n) => Some(*n),
            PageMarker::Ellipsis => None,
        }
    }
}

/// Compute the page bar for `current` out of `total` pages.
///
/// `current` is not validated; out-of-range values produce a well-formed
/// (if unusual) window instead of panicking.
pub fn compute_page_window(current: u32, total: u32) -> Vec<PageMarker> {
    if total <= FULL_WINDOW_MAX {
        return (1..=total).map(PageMarker::Page).collect();
    }

    let mut window = vec![PageMarker::Page(1)];

    if current > 3 {
        window.push(PageMarker::Ellipsis);
    }

    let start = current.saturating_sub(1).max(2);
    let end = current.saturating_add(1).min(total - 1);
    for page in start..=end {
        if !window.contains(&PageMarker::Page(page)) {
            window.push(PageMarker::Page(page));
        }
    }

    if current < total - 2 {
        window.push(PageMarker::Ellipsis);
    }

    if !window.contains(&PageMarker::Page(total)) {
        window.push(PageMarker::Page(total));
    }

    window
}

/// View model for a rendered page bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub current: u32,
    pub total_pages: u32,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub markers: Vec<PageMarker>,
}

impl PaginationView {
    /// `None` when there is at most one page; nothing should be rendered then.
    pub fn build(current: u32, total_pages: u32) -> Option<Self> {
        if total_pages <= 1 {
            return None;
        }

        Some(Self {
            current,
            total_pages,
            prev: (current > 1).then(|| current - 1),
            next: (current < total_pages).then(|| current + 1),
            markers: compute_page_window(current, total_pages),
        })
    }
}
