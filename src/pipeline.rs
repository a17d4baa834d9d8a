//! The dissolve-to-centroids run: resolve the output schema, enumerate the
//! distinct groups, aggregate each group in isolation, and hand the results
//! to a single write handle.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Schema};
use geojson::JsonObject;
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::algorithm::{dissolve_centroid, reproject_to_wgs84};
use crate::error::{DissolveError, DissolveResult};
use crate::group::{distinct_values, select_rows, GroupValue};
use crate::io::geojson::{read_geojson, GeoJsonWriter};
use crate::schema::{resolve_output_schema, OutputSchema};
use crate::table::FeatureTable;

fn default_true() -> bool {
    true
}

/// Parameters of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissolveParams {
    /// Name of the attribute field whose distinct values define the groups.
    pub group_field: String,
    /// Drop features whose group value is null/missing. Present-but-empty
    /// values (`0`, `""`, `false`) are always kept.
    #[serde(default = "default_true")]
    pub ignore_nulls: bool,
    /// Reproject each output centroid to WGS84 after extraction.
    #[serde(default = "default_true")]
    pub project_to_wgs84: bool,
}

impl DissolveParams {
    pub fn new(group_field: impl Into<String>) -> Self {
        Self {
            group_field: group_field.into(),
            ignore_nulls: true,
            project_to_wgs84: true,
        }
    }

    pub fn validate(&self) -> DissolveResult<()> {
        if self.group_field.is_empty() {
            return Err(DissolveError::FieldNotFound(self.group_field.clone()));
        }
        Ok(())
    }
}

/// Destination for aggregated records: one insert per processed group over a
/// handle that lives for the whole run.
pub trait GroupSink {
    fn insert(&mut self, point: &Point<f64>, value: &GroupValue) -> DissolveResult<()>;
}

#[derive(Debug, Default)]
struct TableCollector {
    points: Vec<Point<f64>>,
    values: Vec<GroupValue>,
}

impl GroupSink for TableCollector {
    fn insert(&mut self, point: &Point<f64>, value: &GroupValue) -> DissolveResult<()> {
        self.points.push(*point);
        self.values.push(value.clone());
        Ok(())
    }
}

struct FeatureSink<W: Write> {
    writer: GeoJsonWriter<W>,
    field: String,
}

impl<W: Write> GroupSink for FeatureSink<W> {
    fn insert(&mut self, point: &Point<f64>, value: &GroupValue) -> DissolveResult<()> {
        let mut properties = JsonObject::new();
        properties.insert(self.field.clone(), value.to_json());
        self.writer
            .write_feature(Some(&Geometry::Point(*point)), properties)
    }
}

fn aggregate_group(
    table: &FeatureTable,
    column: &ArrayRef,
    group: &GroupValue,
    params: &DissolveParams,
) -> DissolveResult<Point<f64>> {
    // selection and hull are temporaries of this one group iteration
    let rows = select_rows(column, group)?;
    let selection: Vec<&Geometry<f64>> =
        rows.iter().filter_map(|&row| table.geometry(row)).collect();
    let centroid = dissolve_centroid(&selection)?;
    if params.project_to_wgs84 {
        reproject_to_wgs84(centroid, table.crs())
    } else {
        Ok(centroid)
    }
}

/// Enumerate groups and aggregate each one, feeding `sink`.
///
/// Empty selections and geometry failures skip their group with a warning;
/// sink failures are fatal and leave whatever was already inserted in place.
fn run_groups<S: GroupSink>(
    table: &FeatureTable,
    output: &OutputSchema,
    params: &DissolveParams,
    sink: &mut S,
) -> DissolveResult<(usize, usize)> {
    let column = table.column(output.group_index);
    let groups = distinct_values(column, params.ignore_nulls)?;

    let mut processed = 0;
    let mut skipped = 0;
    for group in &groups {
        let predicate = group.predicate(&params.group_field);
        info!(%predicate, "aggregating group");
        let centroid = match aggregate_group(table, column, group, params) {
            Ok(point) => point,
            Err(err @ (DissolveError::EmptyGroup(_) | DissolveError::Geometry(_))) => {
                warn!(%predicate, error = %err, "skipping group");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        sink.insert(&centroid, group)?;
        processed += 1;
    }
    info!(processed, skipped, "dissolve complete");
    Ok((processed, skipped))
}

fn build_column(data_type: &DataType, values: &[GroupValue]) -> DissolveResult<ArrayRef> {
    let mismatch = |value: &GroupValue| {
        DissolveError::UnsupportedFieldType(format!("{value:?} in a {data_type} column"))
    };
    match data_type {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for value in values {
                match value {
                    GroupValue::Null => builder.append_null(),
                    GroupValue::Bool(v) => builder.append_value(*v),
                    other => return Err(mismatch(other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Int64 => {
            let mut builder = Int64Builder::new();
            for value in values {
                match value {
                    GroupValue::Null => builder.append_null(),
                    GroupValue::Int(v) => builder.append_value(*v),
                    other => return Err(mismatch(other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for value in values {
                match value {
                    GroupValue::Null => builder.append_null(),
                    GroupValue::Float(v) => builder.append_value(*v),
                    other => return Err(mismatch(other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::new();
            for value in values {
                match value {
                    GroupValue::Null => builder.append_null(),
                    GroupValue::Text(v) => builder.append_value(v),
                    other => return Err(mismatch(other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        other => Err(DissolveError::UnsupportedFieldType(other.to_string())),
    }
}

fn build_output(
    output: &OutputSchema,
    collector: TableCollector,
) -> DissolveResult<FeatureTable> {
    let column = build_column(output.field.data_type(), &collector.values)?;
    let schema = Arc::new(Schema::new(vec![output.field.clone()]));
    let batch = RecordBatch::try_new_with_options(
        schema,
        vec![column],
        &RecordBatchOptions::new().with_row_count(Some(collector.values.len())),
    )?;
    let geometry = collector
        .points
        .into_iter()
        .map(|point| Some(Geometry::Point(point)))
        .collect();
    FeatureTable::try_new(batch, geometry, output.crs.clone())
}

/// Run the pipeline in memory, producing the output point collection as a
/// [`FeatureTable`].
pub fn dissolve_centroids(
    table: &FeatureTable,
    params: &DissolveParams,
) -> DissolveResult<FeatureTable> {
    params.validate()?;
    let output = resolve_output_schema(table, params)?;
    let mut collector = TableCollector::default();
    run_groups(table, &output, params, &mut collector)?;
    build_output(&output, collector)
}

/// Run the pipeline file to file: read a GeoJSON collection, aggregate, and
/// stream the point records through one write handle.
pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_path: Q,
    params: &DissolveParams,
) -> DissolveResult<()> {
    params.validate()?;
    let table = read_geojson(BufReader::new(File::open(input)?))?;
    // schema and CRS problems abort before the output file exists
    let output = resolve_output_schema(&table, params)?;

    let file = File::create(output_path)?;
    let writer = GeoJsonWriter::new(BufWriter::new(file), &output.crs)?;
    let mut sink = FeatureSink {
        writer,
        field: output.field.name().clone(),
    };
    run_groups(&table, &output, params, &mut sink)?;
    sink.writer.finish()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use arrow_array::{Array, Int64Array, StringArray};
    use arrow_schema::Field;
    use geo::polygon;
    use geojson::JsonValue;

    use super::*;
    use crate::crs::Crs;

    fn square(cx: f64, cy: f64, half: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: cx - half, y: cy - half),
            (x: cx + half, y: cy - half),
            (x: cx + half, y: cy + half),
            (x: cx - half, y: cy + half),
        ])
    }

    fn region_table(
        values: Vec<Option<&str>>,
        geometry: Vec<Option<Geometry<f64>>>,
        crs: Crs,
    ) -> FeatureTable {
        let schema = Arc::new(Schema::new(vec![Field::new("REGION", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(values)) as ArrayRef],
        )
        .unwrap();
        FeatureTable::try_new(batch, geometry, crs).unwrap()
    }

    fn local_params() -> DissolveParams {
        let mut params = DissolveParams::new("REGION");
        params.project_to_wgs84 = false;
        params
    }

    #[test]
    fn two_groups_three_polygons() {
        // two "A" squares centered on (0,0) and (4,0); one "B" square at (10,10)
        let table = region_table(
            vec![Some("A"), Some("A"), Some("B")],
            vec![
                Some(square(0., 0., 1.)),
                Some(square(4., 0., 1.)),
                Some(square(10., 10., 1.)),
            ],
            Crs::WGS84,
        );
        let out = dissolve_centroids(&table, &local_params()).unwrap();

        assert_eq!(out.len(), 2);
        assert!(!out.schema().field(0).is_nullable());
        let regions = out.column(0).as_string::<i32>();
        assert_eq!(regions.value(0), "A");
        assert_eq!(regions.value(1), "B");

        // hull of the two A squares is symmetric about (2, 0)
        let Some(Geometry::Point(a)) = out.geometry(0) else {
            panic!("expected a point");
        };
        assert_relative_eq!(a.x(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(a.y(), 0.0, epsilon = 1e-12);

        // hull of one polygon is that polygon
        let Some(Geometry::Point(b)) = out.geometry(1) else {
            panic!("expected a point");
        };
        assert_relative_eq!(b.x(), 10.0, epsilon = 1e-12);
        assert_relative_eq!(b.y(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn null_group_policy() {
        let table = region_table(
            vec![Some("A"), Some("A"), Some("B"), None],
            vec![
                Some(square(0., 0., 1.)),
                Some(square(4., 0., 1.)),
                Some(square(10., 10., 1.)),
                Some(square(20., 20., 1.)),
            ],
            Crs::WGS84,
        );

        let mut params = local_params();
        params.ignore_nulls = false;
        let out = dissolve_centroids(&table, &params).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.schema().field(0).is_nullable());
        assert_eq!(out.column(0).null_count(), 1);
        let Some(Geometry::Point(null_centroid)) = out.geometry(2) else {
            panic!("expected a point");
        };
        assert_relative_eq!(null_centroid.x(), 20.0, epsilon = 1e-12);

        params.ignore_nulls = true;
        let out = dissolve_centroids(&table, &params).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.column(0).null_count(), 0);
    }

    #[test]
    fn zero_valued_group_is_kept() {
        let schema = Arc::new(Schema::new(vec![Field::new("CODE", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![Some(0), Some(7), None])) as ArrayRef],
        )
        .unwrap();
        let table = FeatureTable::try_new(
            batch,
            vec![
                Some(square(0., 0., 1.)),
                Some(square(4., 4., 1.)),
                Some(square(8., 8., 1.)),
            ],
            Crs::WGS84,
        )
        .unwrap();

        let mut params = DissolveParams::new("CODE");
        params.project_to_wgs84 = false;
        let out = dissolve_centroids(&table, &params).unwrap();

        assert_eq!(out.len(), 2);
        let codes = out.column(0).as_primitive::<Int64Type>();
        assert_eq!(codes.value(0), 0);
        assert_eq!(codes.value(1), 7);
    }

    #[test]
    fn group_values_are_unique() {
        let table = region_table(
            vec![Some("A"), Some("B"), Some("A"), Some("B"), Some("A")],
            vec![
                Some(square(0., 0., 1.)),
                Some(square(4., 0., 1.)),
                Some(square(8., 0., 1.)),
                Some(square(12., 0., 1.)),
                Some(square(16., 0., 1.)),
            ],
            Crs::WGS84,
        );
        let out = dissolve_centroids(&table, &local_params()).unwrap();
        assert_eq!(out.len(), 2);
        let regions = out.column(0).as_string::<i32>();
        let mut seen: Vec<&str> = (0..out.len()).map(|i| regions.value(i)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), out.len());
    }

    #[test]
    fn reprojection_bounds_and_crs() {
        // squares in web mercator meters
        let table = region_table(
            vec![Some("A"), Some("B")],
            vec![
                Some(square(1_000_000., 7_000_000., 1_000.)),
                Some(square(-2_000_000., 5_000_000., 1_000.)),
            ],
            Crs::from_epsg(3857),
        );

        let params = DissolveParams::new("REGION");
        let out = dissolve_centroids(&table, &params).unwrap();
        assert_eq!(out.crs(), &Crs::WGS84);
        for row in 0..out.len() {
            let Some(Geometry::Point(p)) = out.geometry(row) else {
                panic!("expected a point");
            };
            assert!(p.x() > -180.0 && p.x() < 180.0);
            assert!(p.y() > -90.0 && p.y() < 90.0);
        }

        let out = dissolve_centroids(&table, &local_params()).unwrap();
        assert_eq!(out.crs(), &Crs::from_epsg(3857));
    }

    #[test]
    fn failed_group_does_not_abort_the_run() {
        // every "B" feature is missing its geometry, so the B selection
        // dissolves to nothing and the group is skipped
        let table = region_table(
            vec![Some("A"), Some("B"), Some("B")],
            vec![Some(square(0., 0., 1.)), None, None],
            Crs::WGS84,
        );
        let out = dissolve_centroids(&table, &local_params()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.column(0).as_string::<i32>().value(0), "A");
    }

    #[test]
    fn streaming_sink_writes_point_features() {
        let table = region_table(
            vec![Some("A"), Some("B")],
            vec![Some(square(0., 0., 1.)), Some(square(4., 4., 1.))],
            Crs::WGS84,
        );
        let params = local_params();
        let output = resolve_output_schema(&table, &params).unwrap();

        let mut buffer = Vec::new();
        let mut sink = FeatureSink {
            writer: GeoJsonWriter::new(&mut buffer, &output.crs).unwrap(),
            field: output.field.name().clone(),
        };
        let (processed, skipped) = run_groups(&table, &output, &params, &mut sink).unwrap();
        sink.writer.finish().unwrap();
        assert_eq!((processed, skipped), (2, 0));

        let json: JsonValue = serde_json::from_slice(&buffer).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["REGION"], "A");
        assert_eq!(features[0]["geometry"]["type"], "Point");
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: DissolveParams = serde_json::from_str(r#"{"group_field":"REGION"}"#).unwrap();
        assert!(params.ignore_nulls);
        assert!(params.project_to_wgs84);
        assert!(DissolveParams::new("").validate().is_err());
    }
}
