//! Declarative collection query constraints.
//!
//! A [`CollectionQuery`] names a collection and declares equality filters, an
//! optional sort, and an optional result cap. Sources are asked to honor
//! constraints but are not trusted to: the engine re-applies every constraint
//! it depends on after decode, and the reference in-memory source can be told
//! to ignore constraints so tests can exercise that path.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::time;

/// Constraints for one live collection subscription.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionQuery {
    /// Collection name.
    pub collection: String,
    /// Equality filters, combined with AND.
    pub filters: Vec<FieldFilter>,
    /// Requested result ordering.
    pub order_by: Option<SortSpec>,
    /// Maximum number of records to deliver.
    pub limit: Option<usize>,
}

impl CollectionQuery {
    /// Create an unconstrained query over a collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, equals: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            equals: equals.into(),
        });
        self
    }

    /// Sort ascending by a field.
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(SortSpec {
            field: field.into(),
            direction: SortDirection::Ascending,
        });
        self
    }

    /// Sort descending by a field.
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(SortSpec {
            field: field.into(),
            direction: SortDirection::Descending,
        });
        self
    }

    /// Cap the number of delivered records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a raw document passes every equality filter.
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| doc.get(&f.field).is_some_and(|v| v == &f.equals))
    }

    /// Apply filters, sort, and limit to a raw snapshot.
    ///
    /// This is what a constraint-honoring source runs in-process. The sort is
    /// stable, so records comparing equal keep their insertion order.
    pub fn apply(&self, mut docs: Vec<Value>) -> Vec<Value> {
        docs.retain(|doc| self.matches(doc));

        if let Some(ref sort) = self.order_by {
            docs.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&sort.field).unwrap_or(&Value::Null),
                    b.get(&sort.field).unwrap_or(&Value::Null),
                );
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }

        docs
    }
}

/// One equality filter on a document field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldFilter {
    /// Field name in the raw document.
    pub field: String,
    /// Value the field must equal.
    pub equals: Value,
}

/// Requested ordering for delivered records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    /// Field name in the raw document.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Total comparison over loosely-typed field values.
///
/// Timestamp shapes compare as instants (so ISO strings, epoch numbers, and
/// wrapped objects interleave correctly), plain numbers as numbers, strings
/// lexicographically. Shapes with no sensible mutual order compare equal.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(ta), Some(tb)) = (time::parse_instant(a), time::parse_instant(b)) {
        return ta.cmp(&tb);
    }
    if let (Some(na), Some(nb)) = (a.as_f64(), b.as_f64()) {
        return na.partial_cmp(&nb).unwrap_or(Ordering::Equal);
    }
    if let (Some(sa), Some(sb)) = (a.as_str(), b.as_str()) {
        return sa.cmp(sb);
    }
    Ordering::Equal
}
