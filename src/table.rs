//! In-memory feature collections: an Arrow attribute table with a parallel
//! native geometry column and a spatial reference.

use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{FieldRef, SchemaRef};
use geo_types::Geometry;

use crate::crs::Crs;
use crate::error::{DissolveError, DissolveResult};

/// A feature collection.
///
/// Attributes live in a [`RecordBatch`]; geometries are held as
/// [`geo_types::Geometry`] scalars parallel to the batch's rows (a `None`
/// slot is a feature without a geometry). All rows share one [`Crs`].
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: SchemaRef,
    attributes: RecordBatch,
    geometry: Vec<Option<Geometry<f64>>>,
    crs: Crs,
}

impl FeatureTable {
    /// Construct a table, validating that the geometry column lines up with
    /// the attribute rows.
    pub fn try_new(
        attributes: RecordBatch,
        geometry: Vec<Option<Geometry<f64>>>,
        crs: Crs,
    ) -> DissolveResult<Self> {
        if attributes.num_rows() != geometry.len() {
            return Err(DissolveError::InvalidGeoJson(format!(
                "attribute rows ({}) do not match geometry rows ({})",
                attributes.num_rows(),
                geometry.len()
            )));
        }
        Ok(Self {
            schema: attributes.schema(),
            attributes,
            geometry,
            crs,
        })
    }

    pub fn len(&self) -> usize {
        self.attributes.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn attributes(&self) -> &RecordBatch {
        &self.attributes
    }

    pub fn column(&self, index: usize) -> &ArrayRef {
        self.attributes.column(index)
    }

    pub fn geometries(&self) -> &[Option<Geometry<f64>>] {
        &self.geometry
    }

    pub fn geometry(&self, row: usize) -> Option<&Geometry<f64>> {
        self.geometry[row].as_ref()
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> DissolveResult<(usize, FieldRef)> {
        let index = self
            .schema
            .index_of(name)
            .map_err(|_| DissolveError::FieldNotFound(name.to_string()))?;
        Ok((index, self.schema.field(index).clone().into()))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::StringArray;
    use arrow_schema::{DataType, Field, Schema};
    use geo::polygon;

    use super::*;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("REGION", DataType::Utf8, true)]));
        RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec![Some("A"), Some("B")])) as ArrayRef],
        )
        .unwrap()
    }

    #[test]
    fn row_count_mismatch() {
        let geoms = vec![Some(Geometry::Polygon(polygon![
            (x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.),
        ]))];
        assert!(FeatureTable::try_new(batch(), geoms, Crs::WGS84).is_err());
    }

    #[test]
    fn field_lookup() {
        let table = FeatureTable::try_new(batch(), vec![None, None], Crs::WGS84).unwrap();
        let (index, field) = table.field("REGION").unwrap();
        assert_eq!(index, 0);
        assert_eq!(field.data_type(), &DataType::Utf8);
        assert!(matches!(
            table.field("MISSING"),
            Err(DissolveError::FieldNotFound(name)) if name == "MISSING"
        ));
    }
}
