//! Read a GeoJSON feature collection into a [`FeatureTable`].
//!
//! GeoJSON properties carry no schema, so one is inferred in a first pass
//! over the features: booleans, integers, floats and text map to the
//! matching Arrow types, mixed integer/float columns promote to `Float64`,
//! and anything else (including mixed-type columns) renders as text. A field
//! missing or null on any feature is nullable.

use std::io::Read;
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Field, Schema};
use geojson::{GeoJson, JsonValue};
use geo_types::Geometry;
use indexmap::IndexMap;

use crate::crs::Crs;
use crate::error::{DissolveError, DissolveResult};
use crate::table::FeatureTable;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PropertyKind {
    Bool,
    Int,
    Float,
    Text,
}

impl PropertyKind {
    fn classify(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(_) => Some(Self::Bool),
            JsonValue::Number(n) if n.is_i64() => Some(Self::Int),
            JsonValue::Number(_) => Some(Self::Float),
            _ => Some(Self::Text),
        }
    }

    fn merge(self, other: Self) -> Self {
        use PropertyKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Bool => DataType::Boolean,
            Self::Int => DataType::Int64,
            Self::Float => DataType::Float64,
            Self::Text => DataType::Utf8,
        }
    }
}

#[derive(Debug, Default)]
struct FieldInference {
    kind: Option<PropertyKind>,
    non_null: usize,
}

enum ColumnBuilder {
    Bool(BooleanBuilder),
    Int(Int64Builder),
    Float(Float64Builder),
    Text(StringBuilder),
}

impl ColumnBuilder {
    fn new(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Bool => Self::Bool(BooleanBuilder::new()),
            PropertyKind::Int => Self::Int(Int64Builder::new()),
            PropertyKind::Float => Self::Float(Float64Builder::new()),
            PropertyKind::Text => Self::Text(StringBuilder::new()),
        }
    }

    fn append(&mut self, value: Option<&JsonValue>) {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return self.append_null();
        };
        match self {
            Self::Bool(builder) => builder.append_option(value.as_bool()),
            Self::Int(builder) => builder.append_option(value.as_i64()),
            Self::Float(builder) => builder.append_option(value.as_f64()),
            Self::Text(builder) => match value {
                JsonValue::String(s) => builder.append_value(s),
                other => builder.append_value(other.to_string()),
            },
        }
    }

    fn append_null(&mut self) {
        match self {
            Self::Bool(builder) => builder.append_null(),
            Self::Int(builder) => builder.append_null(),
            Self::Float(builder) => builder.append_null(),
            Self::Text(builder) => builder.append_null(),
        }
    }

    fn finish(self) -> ArrayRef {
        match self {
            Self::Bool(mut builder) => Arc::new(builder.finish()),
            Self::Int(mut builder) => Arc::new(builder.finish()),
            Self::Float(mut builder) => Arc::new(builder.finish()),
            Self::Text(mut builder) => Arc::new(builder.finish()),
        }
    }
}

/// Read a GeoJSON feature collection.
pub fn read_geojson<R: Read>(mut reader: R) -> DissolveResult<FeatureTable> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let collection = match raw.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        other => {
            return Err(DissolveError::InvalidGeoJson(format!(
                "expected a FeatureCollection, got {}",
                match other {
                    GeoJson::Feature(_) => "a Feature",
                    _ => "a bare Geometry",
                }
            )))
        }
    };
    let crs = Crs::from_foreign_members(collection.foreign_members.as_ref())?;
    let count = collection.features.len();

    let mut inference: IndexMap<String, FieldInference> = IndexMap::new();
    for feature in &collection.features {
        for (name, value) in feature.properties.iter().flatten() {
            let entry = inference.entry(name.clone()).or_default();
            if let Some(kind) = PropertyKind::classify(value) {
                entry.kind = Some(entry.kind.map_or(kind, |prior| prior.merge(kind)));
                entry.non_null += 1;
            }
        }
    }

    let mut fields = Vec::with_capacity(inference.len());
    let mut builders = Vec::with_capacity(inference.len());
    for (name, inferred) in &inference {
        // a column that never held a value stays text-typed and all-null
        let kind = inferred.kind.unwrap_or(PropertyKind::Text);
        fields.push(Field::new(name, kind.data_type(), inferred.non_null < count));
        builders.push(ColumnBuilder::new(kind));
    }

    for feature in &collection.features {
        for (builder, name) in builders.iter_mut().zip(inference.keys()) {
            builder.append(feature.properties.as_ref().and_then(|p| p.get(name)));
        }
    }
    let columns: Vec<ArrayRef> = builders.into_iter().map(ColumnBuilder::finish).collect();

    let mut geometry = Vec::with_capacity(count);
    for feature in collection.features {
        match feature.geometry {
            Some(g) => geometry.push(Some(Geometry::try_from(g.value)?)),
            None => geometry.push(None),
        }
    }

    let batch = RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &RecordBatchOptions::new().with_row_count(Some(count)),
    )?;
    FeatureTable::try_new(batch, geometry, crs)
}
