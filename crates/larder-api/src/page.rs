// Pagination envelope shared by all collection endpoints.

use serde::{Deserialize, Serialize};

/// Generic pagination wrapper returned by all list endpoints.
///
/// `current_page` is 1-based. Invariants maintained by the backend:
/// `items.len() <= page_size`, `has_next == current_page < total_pages`,
/// `has_previous == current_page > 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// The well-defined "nothing" value used when a collection fetch
    /// fails: callers cannot distinguish it from a genuinely empty
    /// result through this path.
    pub fn empty(page_size: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            page_size,
            total_count: 0,
            has_previous: false,
            has_next: false,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_envelope() {
        let body = serde_json::json!({
            "currentPage": 2,
            "totalPages": 10,
            "pageSize": 10,
            "totalCount": 95,
            "hasPrevious": true,
            "hasNext": true,
            "items": ["a", "b"]
        });

        let page: Page<String> = serde_json::from_value(body).unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_count, 95);
        assert_eq!(page.items, ["a", "b"]);
    }

    #[test]
    fn pagination_invariants_hold_at_the_edges() {
        // totalCount=95, pageSize=10 -> 10 pages, 5 items on the last.
        let last: Page<u8> = serde_json::from_value(serde_json::json!({
            "currentPage": 10,
            "totalPages": 10,
            "pageSize": 10,
            "totalCount": 95,
            "hasPrevious": true,
            "hasNext": false,
            "items": [1, 2, 3, 4, 5]
        }))
        .unwrap();

        assert_eq!(last.total_pages, 10);
        assert!(last.items.len() <= last.page_size as usize);
        assert_eq!(last.has_next, last.current_page < last.total_pages);
        assert_eq!(last.has_previous, last.current_page > 1);

        let first: Page<u8> = serde_json::from_value(serde_json::json!({
            "currentPage": 1,
            "totalPages": 10,
            "pageSize": 10,
            "totalCount": 95,
            "hasPrevious": false,
            "hasNext": true,
            "items": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
        }))
        .unwrap();
        assert!(!first.has_previous);
        assert!(first.has_next);
    }

    #[test]
    fn empty_page_is_well_defined() {
        let page: Page<String> = Page::empty(50);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.total_count, 0);
        assert!(!page.has_previous);
        assert!(!page.has_next);
        assert!(page.is_empty());
    }
}
