//! Pagination over a counted result set.

use serde::Serialize;

/// One page of `item_count` items. An empty set, or an index past the last page, yields
/// page 1 with a zero limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub fn new(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = item_count.div_ceil(page_size);
        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            (page_index, page_size * (page_index - 1), page_size)
        };
        Page {
            item_count,
            page_index,
            page_size,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }
}

/// Page number from user input; anything unparsable or below 1 becomes 1.
pub fn get_page_index(page: &str) -> u64 {
    page.trim().parse::<i64>().ok().filter(|p| *p >= 1).unwrap_or(1) as u64
}
