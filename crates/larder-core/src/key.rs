// ── Cache keys ──
//
// A ResourceKey identifies one queryable collection or single entity:
// a resource kind plus a normalized parameter map. Two keys are equal
// iff the kind matches and the params are equal after normalization —
// insertion order never matters (BTreeMap), absent/empty values are
// never stored, and multi-valued params are sorted.

use std::collections::BTreeMap;
use std::fmt;

use larder_api::{FilterValue, ListQuery};

/// A named category of server-backed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Milestones,
    MilestoneRequirements,
    Payments,
    Subscriptions,
    Recipes,
    TradeOffers,
    Users,
    Units,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Milestones => "milestones",
            Self::MilestoneRequirements => "milestone-requirements",
            Self::Payments => "payments",
            Self::Subscriptions => "subscriptions",
            Self::Recipes => "recipes",
            Self::TradeOffers => "trade-offers",
            Self::Users => "users",
            Self::Units => "units",
        }
    }

    /// Kinds whose cached views embed data from this kind and must be
    /// invalidated alongside it. The rule is deliberately broad:
    /// requirement counts are embedded in milestone list/detail views,
    /// and a moderation decision can change a user's standing.
    pub fn dependents(self) -> &'static [ResourceKind] {
        match self {
            Self::MilestoneRequirements => &[Self::Milestones],
            Self::TradeOffers => &[Self::Users],
            _ => &[],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized parameter value. Only primitives and lists of
/// primitives — never live object references — so key equality is
/// stable across reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Text(String),
    Flag(bool),
    Int(i64),
    Many(Vec<String>),
}

impl ParamValue {
    /// Multi-valued param with value order normalized away.
    pub fn many(mut values: Vec<String>) -> Self {
        values.sort();
        Self::Many(values)
    }
}

/// Identifies one queryable collection or single entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    params: BTreeMap<String, ParamValue>,
}

impl ResourceKey {
    /// Key for an unparameterized collection of `kind`.
    pub fn collection(kind: ResourceKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Key for a single entity of `kind`.
    pub fn entity(kind: ResourceKind, id: impl fmt::Display) -> Self {
        Self::collection(kind).with_param("id", ParamValue::Text(id.to_string()))
    }

    /// Add a parameter. Empty text values are dropped — "no constraint"
    /// and "explicit empty search" produce the same key.
    pub fn with_param(mut self, field: impl Into<String>, value: ParamValue) -> Self {
        if let ParamValue::Text(ref s) = value {
            if s.is_empty() {
                return self;
            }
        }
        self.params.insert(field.into(), value);
        self
    }

    /// Derive the key for a collection request.
    pub fn from_query(kind: ResourceKind, query: &ListQuery) -> Self {
        let mut key = Self::collection(kind)
            .with_param("pageNumber", ParamValue::Int(i64::from(query.page_number)))
            .with_param("pageSize", ParamValue::Int(i64::from(query.page_size)));

        if let Some(ref sort_by) = query.sort_by {
            key = key
                .with_param("sortBy", ParamValue::Text(sort_by.clone()))
                .with_param("order", ParamValue::Text(query.order.to_string()));
        }

        for (field, value) in &query.filters {
            let param = match value {
                FilterValue::Text(s) => ParamValue::Text(s.clone()),
                FilterValue::Flag(b) => ParamValue::Flag(*b),
                FilterValue::Many(v) => ParamValue::many(v.clone()),
            };
            key = key.with_param(field.clone(), param);
        }

        key
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (field, value) in &self.params {
            write!(f, ";{field}={value:?}")?;
        }
        Ok(())
    }
}
