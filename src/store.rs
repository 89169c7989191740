//! Record-store seam. Everything the tracker persists goes through
//! [`RecordStore`], which speaks in untyped JSON rows so that the backing
//! service can be swapped without touching the tracking logic.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

use crate::models::UserId;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Activities,
    Tracking,
    Lists,
    ListItems,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Activities => "activities",
            Collection::Tracking => "tracking",
            Collection::Lists => "lists",
            Collection::ListItems => "list_items",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} already has a row for {key}")]
    Conflict { collection: &'static str, key: String },

    #[error("malformed row: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Serialize) -> Self {
        Self {
            field,
            value: serde_json::to_value(value).unwrap_or(Value::Null),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(self.field).unwrap_or(&Value::Null) == &self.value
    }
}

pub fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub field: &'static str,
    pub ascending: bool,
}

impl Order {
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            ascending: true,
        }
    }

    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            ascending: false,
        }
    }

    /// Nulls sort last in both directions.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(self.field).unwrap_or(&Value::Null);
        let right = b.get(self.field).unwrap_or(&Value::Null);
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = compare_values(left, right);
                if self.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(
        &self,
        collection: Collection,
        filters: &[Filter],
        order: Option<Order>,
    ) -> Result<Vec<Row>, StoreError>;

    /// Inserts `row` and returns it as stored, with `id` and `created_at`
    /// filled in when the caller left them out.
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, StoreError>;

    /// Merges `patch` into every matching row. Returns the number of rows touched.
    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        patch: Row,
    ) -> Result<usize, StoreError>;

    async fn delete(&self, collection: Collection, filters: &[Filter]) -> Result<usize, StoreError>;

    fn current_user(&self) -> Option<UserId>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::Malformed(serde::de::Error::custom(format!(
            "expected an object row, got {other}"
        )))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}

/// Builds a one-or-more field patch, e.g. `patch([("checked", true.into())])`.
pub fn patch<const N: usize>(fields: [(&str, Value); N]) -> Row {
    fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}
