//! Group values: the sum type standing in for one cell of the group column,
//! the distinct-value scan, and row selection.

use std::hash::{Hash, Hasher};

use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};
use arrow_array::{Array, ArrayRef};
use arrow_schema::DataType;
use geojson::JsonValue;
use indexmap::IndexSet;
use serde_json::Number;

use crate::error::{DissolveError, DissolveResult};

/// One distinct value of the group field.
///
/// `Null` is the missing-value marker; it is a real group when the
/// null-inclusion policy keeps it. Floats compare and hash by bit pattern so
/// values can key an [`IndexSet`].
#[derive(Debug, Clone)]
pub enum GroupValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for GroupValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for GroupValue {}

impl Hash for GroupValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Text(v) => v.hash(state),
        }
    }
}

impl GroupValue {
    /// Whether this is the null/missing marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The selection predicate for this value: equality against the literal
    /// (text single-quoted, numeric and boolean literals bare), or an
    /// `IS NULL` test for the null marker.
    pub fn predicate(&self, field: &str) -> String {
        match self {
            Self::Null => format!("{field} IS NULL"),
            Self::Bool(v) => format!("{field} = {v}"),
            Self::Int(v) => format!("{field} = {v}"),
            Self::Float(v) => format!("{field} = {v}"),
            Self::Text(v) => format!("{field} = '{}'", v.replace('\'', "''")),
        }
    }

    /// The JSON rendition written to output feature properties.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(v) => JsonValue::Bool(*v),
            Self::Int(v) => JsonValue::Number(Number::from(*v)),
            Self::Float(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(v) => JsonValue::String(v.clone()),
        }
    }
}

/// Read row `row` of the group column as a [`GroupValue`].
pub(crate) fn value_at(column: &ArrayRef, row: usize) -> DissolveResult<GroupValue> {
    if column.is_null(row) {
        return Ok(GroupValue::Null);
    }
    let value = match column.data_type() {
        DataType::Boolean => GroupValue::Bool(column.as_boolean().value(row)),
        DataType::Int64 => GroupValue::Int(column.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => GroupValue::Float(column.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => GroupValue::Text(column.as_string::<i32>().value(row).to_string()),
        other => return Err(DissolveError::UnsupportedFieldType(other.to_string())),
    };
    Ok(value)
}

/// Scan the group column once and return the set of distinct values, in
/// first-seen order.
///
/// With `ignore_nulls` the null marker is dropped from the set; present but
/// "empty" values (`0`, `0.0`, `""`, `false`) are kept either way — only
/// genuinely missing values are subject to the policy.
pub fn distinct_values(
    column: &ArrayRef,
    ignore_nulls: bool,
) -> DissolveResult<IndexSet<GroupValue>> {
    let mut values = IndexSet::new();
    for row in 0..column.len() {
        let value = value_at(column, row)?;
        if ignore_nulls && value.is_null() {
            continue;
        }
        values.insert(value);
    }
    Ok(values)
}

/// Row indices whose group-column value equals `value`. The null marker
/// matches exactly the null slots.
pub fn select_rows(column: &ArrayRef, value: &GroupValue) -> DissolveResult<Vec<usize>> {
    let mut rows = Vec::new();
    for row in 0..column.len() {
        if value_at(column, row)? == *value {
            rows.push(row);
        }
    }
    Ok(rows)
}
