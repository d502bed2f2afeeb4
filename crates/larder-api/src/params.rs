// List query parameters and their wire serialization.
//
// The backend is strict about parameter shape: booleans must be the
// literal strings "true"/"false", multi-valued parameters must repeat
// the name (…&ids=a&ids=b), and empty values must be omitted entirely.

use std::collections::BTreeMap;

/// Sort direction, serialized as `ASC` / `DESC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter value.
///
/// `Text("")` means "explicit empty search" in the UI and is normalized
/// to "no constraint" here — it never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
    Many(Vec<String>),
}

/// Parameters for one collection request.
///
/// `page_number` is 1-based. Filters are kept in a `BTreeMap` so the
/// serialized form is deterministic regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_number: u32,
    pub page_size: u32,
    pub sort_by: Option<String>,
    pub order: SortOrder,
    pub filters: BTreeMap<String, FilterValue>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 50,
            sort_by: None,
            order: SortOrder::default(),
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.order = order;
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// Serialize to `(name, value)` pairs for `reqwest`'s `.query()`.
    ///
    /// Rules (backend compatibility, preserved exactly):
    /// - empty-string text filters are omitted,
    /// - booleans serialize as `"true"` / `"false"`,
    /// - multi-valued filters repeat the name, one pair per value,
    /// - `pageNumber` and `pageSize` are always present,
    /// - `sortBy`/`order` only when a sort field is set.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        for (field, value) in &self.filters {
            match value {
                FilterValue::Text(s) => {
                    if !s.is_empty() {
                        pairs.push((field.clone(), s.clone()));
                    }
                }
                FilterValue::Flag(b) => {
                    pairs.push((field.clone(), if *b { "true" } else { "false" }.to_owned()));
                }
                FilterValue::Many(values) => {
                    for v in values {
                        if !v.is_empty() {
                            pairs.push((field.clone(), v.clone()));
                        }
                    }
                }
            }
        }

        pairs.push(("pageNumber".into(), self.page_number.to_string()));
        pairs.push(("pageSize".into(), self.page_size.to_string()));

        if let Some(ref sort_by) = self.sort_by {
            pairs.push(("sortBy".into(), sort_by.clone()));
            pairs.push(("order".into(), self.order.to_string()));
        }

        pairs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pairs_of(query: &ListQuery) -> Vec<(String, String)> {
        query.to_query_pairs()
    }

    #[test]
    fn empty_text_filter_is_omitted() {
        let query = ListQuery::new(10)
            .with_filter("searchText", FilterValue::Text(String::new()))
            .with_filter("category", FilterValue::Text("fruit".into()));

        let pairs = pairs_of(&query);
        assert!(!pairs.iter().any(|(k, _)| k == "searchText"));
        assert!(pairs.contains(&("category".into(), "fruit".into())));
    }

    #[test]
    fn booleans_serialize_as_literal_strings() {
        let query = ListQuery::new(10)
            .with_filter("archived", FilterValue::Flag(false))
            .with_filter("verified", FilterValue::Flag(true));

        let pairs = pairs_of(&query);
        assert!(pairs.contains(&("archived".into(), "false".into())));
        assert!(pairs.contains(&("verified".into(), "true".into())));
    }

    #[test]
    fn multi_valued_filters_repeat_the_name() {
        let query = ListQuery::new(10).with_filter(
            "ids",
            FilterValue::Many(vec!["a".into(), "b".into(), "c".into()]),
        );

        let pairs = pairs_of(&query);
        let ids: Vec<&str> = pairs
            .iter()
            .filter(|(k, _)| k == "ids")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn pagination_is_always_present_sort_only_when_set() {
        let plain = pairs_of(&ListQuery::new(25).with_page(3));
        assert!(plain.contains(&("pageNumber".into(), "3".into())));
        assert!(plain.contains(&("pageSize".into(), "25".into())));
        assert!(!plain.iter().any(|(k, _)| k == "sortBy"));

        let sorted = pairs_of(&ListQuery::new(25).with_sort("Name", SortOrder::Descending));
        assert!(sorted.contains(&("sortBy".into(), "Name".into())));
        assert!(sorted.contains(&("order".into(), "DESC".into())));
    }

    #[test]
    fn filter_serialization_is_order_independent() {
        let a = ListQuery::new(10)
            .with_filter("b", FilterValue::Text("2".into()))
            .with_filter("a", FilterValue::Text("1".into()));
        let b = ListQuery::new(10)
            .with_filter("a", FilterValue::Text("1".into()))
            .with_filter("b", FilterValue::Text("2".into()));

        assert_eq!(a.to_query_pairs(), b.to_query_pairs());
    }
}
