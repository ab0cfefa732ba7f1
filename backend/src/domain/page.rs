//! Pagination envelope shared by list and search operations.

use serde::{Deserialize, Serialize};

/// Caller-supplied page selection, 1-indexed. Zero values are clamped to
/// their minimums rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Page number, starting at 1.
    pub page: usize,
    /// Records per page.
    pub per_page: usize,
}

impl PageRequest {
    /// First page with the given size.
    pub fn first(per_page: usize) -> Self {
        Self { page: 1, per_page }
    }

    /// Page and size with minimums applied.
    fn clamped(self) -> (usize, usize) {
        (self.page.max(1), self.per_page.max(1))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// One page of an ordered result set, with enough shape for a client to
/// render pagination controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// Total records across all pages.
    pub total: usize,
    /// 1-indexed page number.
    pub page: usize,
    /// Total number of pages (0 when the result set is empty).
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice an already ordered full result set down to one page.
    pub fn slice(mut items: Vec<T>, request: PageRequest) -> Self {
        let (page, per_page) = request.clamped();
        let total = items.len();
        let start = (page - 1).saturating_mul(per_page);
        let items = if start >= total {
            Vec::new()
        } else {
            items.drain(start..total.min(start + per_page)).collect()
        };
        Self {
            items,
            total,
            page,
            total_pages: total.div_ceil(per_page),
        }
    }

    /// Map the page's items, keeping the envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_one_indexed_pages() {
        let page = Page::slice((1..=7).collect(), PageRequest { page: 2, per_page: 3 });
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn out_of_range_page_is_empty_but_keeps_totals() {
        let page = Page::slice(vec![1, 2], PageRequest { page: 9, per_page: 2 });
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn zero_inputs_clamp_to_minimums() {
        let page = Page::slice(vec![1, 2, 3], PageRequest { page: 0, per_page: 0 });
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec![1]);
    }
}
