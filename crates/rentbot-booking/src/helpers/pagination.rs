// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Zero-indexed slicing of lists for keyboard rendering.

pub const DEFAULT_ITEM_PAGE_SIZE: usize = 8;
pub const DEFAULT_BOOKING_PAGE_SIZE: usize = 5;

/// One page of a larger slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Returns page `page` of `items`, clamped to the last page.
/// A zero `size` falls back to `fallback`.
pub fn paginate<T>(items: &[T], page: usize, size: usize, fallback: usize) -> Page<'_, T> {
    let size = if size == 0 { fallback.max(1) } else { size };
    let total_pages = items.len().div_ceil(size).max(1);
    let page = page.min(total_pages - 1);
    let start = (page * size).min(items.len());
    let end = (start + size).min(items.len());
    Page {
        items: &items[start..end],
        page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_has_both_neighbours() {
        let items: Vec<u32> = (0..20).collect();
        let page = paginate(&items, 1, 8, DEFAULT_ITEM_PAGE_SIZE);
        assert_eq!(page.items, &items[8..16]);
        assert!(page.has_prev());
        assert!(page.has_next());
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn out_of_range_page_is_clamped() {
        let items: Vec<u32> = (0..6).collect();
        let page = paginate(&items, 9, 5, DEFAULT_BOOKING_PAGE_SIZE);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, &[5]);
        assert!(!page.has_next());
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let items: Vec<u32> = Vec::new();
        let page = paginate(&items, 0, 0, DEFAULT_ITEM_PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_prev() && !page.has_next());
    }
}
