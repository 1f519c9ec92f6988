//! Page envelope and slicing
//!
//! The [`PagedList`] envelope carries one page of results plus pagination
//! metadata; [`paginate_with`] clamps the requested page/size against the
//! configured bounds, slices exactly one page out of an ordered sequence, and
//! applies the caller's projection to the items of that page only.
//!
//! A page number past the end is not an error: it produces an empty page with
//! consistent metadata.

use serde::{Deserialize, Serialize};

use crate::config::QueryConfig;

/// One page of results plus derived pagination metadata
///
/// Invariants: `page_count == ceil(total_item_count / page_size)` when
/// `page_size > 0`, else `0`; `page_data.len() <= page_size`.
///
/// # Example
///
/// ```rust
/// use sift_service::query::PagedList;
///
/// let page = PagedList::new(vec!["a", "b"], 12, 2, 5);
/// assert_eq!(page.page_count, 3);
/// assert!(page.has_previous_page);
/// assert!(page.has_next_page);
/// assert_eq!(page.first_item_on_page, 6);
/// assert_eq!(page.last_item_on_page, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedList<T> {
    /// Total number of pages
    pub page_count: u32,
    /// Total number of matching items across all pages
    pub total_item_count: u64,
    /// Page number actually used (1-based)
    pub page_number: u32,
    /// Page size actually used
    pub page_size: u32,
    /// Whether a page precedes this one
    pub has_previous_page: bool,
    /// Whether a page follows this one
    pub has_next_page: bool,
    /// Whether this is the first page
    pub is_first_page: bool,
    /// Whether this is the last page
    pub is_last_page: bool,
    /// 1-based ordinal of the first item on this page
    pub first_item_on_page: u64,
    /// 1-based ordinal of the last item on this page
    pub last_item_on_page: u64,
    /// The items of exactly this page
    pub page_data: Vec<T>,
}

impl<T> PagedList<T> {
    /// Build the envelope from an already-sliced page
    ///
    /// `page_number` and `page_size` are the effective (clamped) values; all
    /// other metadata is derived here.
    #[must_use]
    pub fn new(page_data: Vec<T>, total_item_count: u64, page_number: u32, page_size: u32) -> Self {
        let page_count = if total_item_count > 0 && page_size > 0 {
            (total_item_count.div_ceil(u64::from(page_size))) as u32
        } else {
            0
        };
        // Page numbers are 1-based; tolerate a raw 0 instead of underflowing.
        let first_item_on_page =
            u64::from(page_number.saturating_sub(1)) * u64::from(page_size) + 1;
        let last_item_on_page =
            (first_item_on_page + u64::from(page_size) - 1).min(total_item_count);

        Self {
            page_count,
            total_item_count,
            page_number,
            page_size,
            has_previous_page: page_number > 1,
            has_next_page: page_number < page_count,
            is_first_page: page_number == 1,
            is_last_page: page_number >= page_count,
            first_item_on_page,
            last_item_on_page,
            page_data,
        }
    }
}

/// Clamp a requested page number: absent or `< 1` becomes `1`
#[must_use]
pub fn effective_page(requested: Option<u32>) -> u32 {
    match requested {
        Some(page) if page >= 1 => page,
        _ => 1,
    }
}

/// Clamp a requested page size against the configured bounds
///
/// Absent or `< 1` uses the configured default; anything above the maximum
/// is clamped to it.
#[must_use]
pub fn effective_page_size(requested: Option<u32>, config: &QueryConfig) -> u32 {
    match requested {
        Some(size) if size >= 1 => size.min(config.max_page_size),
        _ => config.default_page_size,
    }
}

/// Slice one page out of an ordered sequence and project its items
///
/// The projection runs only over the items of the returned page, never over
/// the whole match set.
pub fn paginate_with<T, U>(
    rows: Vec<T>,
    total_item_count: u64,
    requested_page: Option<u32>,
    requested_page_size: Option<u32>,
    config: &QueryConfig,
    mut project: impl FnMut(T) -> U,
) -> PagedList<U> {
    let page_number = effective_page(requested_page);
    let page_size = effective_page_size(requested_page_size, config);

    let skip = (page_number as usize - 1).saturating_mul(page_size as usize);
    let page_data: Vec<U> = rows
        .into_iter()
        .skip(skip)
        .take(page_size as usize)
        .map(&mut project)
        .collect();

    PagedList::new(page_data, total_item_count, page_number, page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QueryConfig {
        QueryConfig {
            default_page_size: 20,
            max_page_size: 100,
            ..QueryConfig::default()
        }
    }

    #[test]
    fn test_effective_page_clamps_to_one() {
        assert_eq!(effective_page(None), 1);
        assert_eq!(effective_page(Some(0)), 1);
        assert_eq!(effective_page(Some(1)), 1);
        assert_eq!(effective_page(Some(7)), 7);
    }

    #[test]
    fn test_effective_page_size_bounds() {
        let config = config();
        assert_eq!(effective_page_size(None, &config), 20);
        assert_eq!(effective_page_size(Some(0), &config), 20);
        assert_eq!(effective_page_size(Some(50), &config), 50);
        assert_eq!(effective_page_size(Some(500), &config), 100);
    }

    #[test]
    fn test_twenty_five_items_page_three_of_ten() {
        let rows: Vec<u32> = (1..=25).collect();
        let page = paginate_with(rows, 25, Some(3), Some(10), &config(), |n| n);
        assert_eq!(page.page_number, 3);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.page_data.len(), 5);
        assert_eq!(page.page_data, vec![21, 22, 23, 24, 25]);
        assert!(page.is_last_page);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
        assert_eq!(page.first_item_on_page, 21);
        assert_eq!(page.last_item_on_page, 25);
    }

    #[test]
    fn test_page_beyond_page_count_is_empty_not_an_error() {
        let rows: Vec<u32> = (1..=25).collect();
        let page = paginate_with(rows, 25, Some(10), Some(10), &config(), |n| n);
        assert!(page.page_data.is_empty());
        assert_eq!(page.page_number, 10);
        assert_eq!(page.page_count, 3);
        assert!(page.is_last_page);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_empty_set_has_zero_pages() {
        let page = paginate_with(Vec::<u32>::new(), 0, None, None, &config(), |n| n);
        assert_eq!(page.page_count, 0);
        assert_eq!(page.total_item_count, 0);
        assert_eq!(page.page_number, 1);
        assert!(page.page_data.is_empty());
        assert!(!page.has_previous_page);
        assert!(!page.has_next_page);
        assert!(page.is_first_page);
        assert!(page.is_last_page);
    }

    #[test]
    fn test_item_ordinal_formulas() {
        let rows: Vec<u32> = (1..=42).collect();
        let page = paginate_with(rows, 42, Some(2), Some(10), &config(), |n| n);
        assert_eq!(page.first_item_on_page, 11);
        assert_eq!(page.last_item_on_page, 20);
        assert_eq!(page.page_count, 5);
    }

    #[test]
    fn test_projection_applies_to_page_only() {
        let rows: Vec<u32> = (1..=30).collect();
        let mut projected = 0_usize;
        let page = paginate_with(rows, 30, Some(1), Some(10), &config(), |n| {
            projected += 1;
            n * 2
        });
        assert_eq!(projected, 10, "projection must not touch other pages");
        assert_eq!(page.page_data[0], 2);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let page = PagedList::new(vec![1, 2], 2, 1, 20);
        let json = serde_json::to_value(&page).unwrap();
        for key in [
            "pageCount",
            "totalItemCount",
            "pageNumber",
            "pageSize",
            "hasPreviousPage",
            "hasNextPage",
            "isFirstPage",
            "isLastPage",
            "firstItemOnPage",
            "lastItemOnPage",
            "pageData",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_page_zero_does_not_underflow() {
        let page = PagedList::<u32>::new(vec![], 5, 0, 10);
        assert_eq!(page.first_item_on_page, 1);
        assert_eq!(page.last_item_on_page, 5);
    }

    #[test]
    fn test_page_count_invariant() {
        for (total, size, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2)] {
            let page = PagedList::<u32>::new(vec![], total, 1, size);
            assert_eq!(page.page_count, expected, "total={total} size={size}");
        }
    }
}
