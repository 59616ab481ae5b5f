//! Collection queries
//!
//! Equality filters plus an optional single-field ordering, the subset the
//! board needs: "all fault records" and "records by status, newest first".

use crate::document::Document;
use faultboard_graph::{Category, Timestamp};
use serde_json::Value;
use std::cmp::Ordering;

/// Equality filter on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Field name
    pub field: String,
    /// Required value
    pub value: Value,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field name
    pub field: String,
    /// Direction
    pub direction: Direction,
}

/// Query over the record collection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    filters: Vec<Filter>,
    order_by: Option<OrderBy>,
}

impl Query {
    /// Every document
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Documents of one category
    #[must_use]
    pub fn category(category: Category) -> Self {
        Self::all().where_eq("category", category.as_str())
    }

    /// Add an equality filter
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Order results by a field
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Filters in declaration order
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether a document passes every filter
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| document.get(&f.field) == Some(&f.value))
    }

    /// Filter and order documents
    ///
    /// Without an ordering clause documents come back in id order. Ties in
    /// the ordering field are broken by id as well.
    pub fn apply<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|d| self.matches(d))
            .cloned()
            .collect();

        match &self.order_by {
            Some(order) => matched.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                let ord = match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                ord.then_with(|| a.id.cmp(&b.id))
            }),
            None => matched.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        matched
    }
}

/// Total order over field values: missing/null, bools, numbers, timestamps,
/// strings, then anything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => as_timestamp(x).cmp(&as_timestamp(y)),
        _ => Ordering::Equal,
    })
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(v) if as_timestamp(v).is_some() => 3,
        Some(Value::String(_)) => 4,
        Some(_) => 5,
    }
}

fn as_timestamp(value: &Value) -> Option<Timestamp> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
