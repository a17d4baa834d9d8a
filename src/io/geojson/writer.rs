//! Streaming GeoJSON output.
//!
//! [`GeoJsonWriter`] is the run's single write handle: opened once, fed one
//! record at a time, closed with [`finish`][GeoJsonWriter::finish]. A
//! non-WGS84 reference is recorded in the legacy `crs` member, matching what
//! the reader accepts.

use std::io::Write;

use geojson::JsonObject;
use geo_types::Geometry;

use crate::crs::Crs;
use crate::error::DissolveResult;
use crate::group::value_at;
use crate::table::FeatureTable;

/// Incremental writer for one GeoJSON feature collection.
pub struct GeoJsonWriter<W: Write> {
    writer: W,
    count: usize,
}

impl<W: Write> GeoJsonWriter<W> {
    /// Open the collection and write its header.
    pub fn new(mut writer: W, crs: &Crs) -> DissolveResult<Self> {
        write!(writer, "{{\"type\":\"FeatureCollection\",")?;
        if let Some(member) = crs.foreign_member() {
            write!(writer, "\"crs\":")?;
            serde_json::to_writer(&mut writer, &member)?;
            write!(writer, ",")?;
        }
        write!(writer, "\"features\":[")?;
        Ok(Self { writer, count: 0 })
    }

    /// Append one feature.
    pub fn write_feature(
        &mut self,
        geometry: Option<&Geometry<f64>>,
        properties: JsonObject,
    ) -> DissolveResult<()> {
        let feature = geojson::Feature {
            bbox: None,
            geometry: geometry.map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };
        if self.count > 0 {
            write!(self.writer, ",")?;
        }
        serde_json::to_writer(&mut self.writer, &feature)?;
        self.count += 1;
        Ok(())
    }

    /// Number of features written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Close the collection and flush.
    pub fn finish(mut self) -> DissolveResult<()> {
        write!(self.writer, "]}}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a whole [`FeatureTable`] as a GeoJSON feature collection.
pub fn write_geojson<W: Write>(table: &FeatureTable, writer: W) -> DissolveResult<()> {
    let mut out = GeoJsonWriter::new(writer, table.crs())?;
    let schema = table.schema().clone();
    for row in 0..table.len() {
        let mut properties = JsonObject::new();
        for (index, field) in schema.fields().iter().enumerate() {
            let value = value_at(table.column(index), row)?;
            properties.insert(field.name().clone(), value.to_json());
        }
        out.write_feature(table.geometry(row), properties)?;
    }
    out.finish()
}
