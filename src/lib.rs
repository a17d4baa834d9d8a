//! Group polygon features by an attribute value and emit, per group, the
//! true centroid of the convex hull enclosing all of the group's polygons.
//!
//! The pipeline has four stages, run strictly forward within one invocation:
//!
//! 1. **Schema resolution** — derive the output point collection's schema
//!    from the source group field ([`resolve_output_schema`]).
//! 2. **Group enumeration** — one scan of the group column producing the
//!    distinct value set under a null-inclusion policy ([`distinct_values`]).
//! 3. **Aggregation** — per group: select members, dissolve them into one
//!    convex hull, take its centroid, optionally reproject it to WGS84
//!    ([`algorithm::dissolve_centroid`], [`algorithm::reproject_to_wgs84`]).
//!    Failures here skip the group; the run continues.
//! 4. **Writing** — one record per processed group through a single write
//!    handle ([`io::geojson::GeoJsonWriter`]).
//!
//! [`dissolve_centroids`] runs the pipeline over an in-memory
//! [`FeatureTable`]; [`run`] goes GeoJSON file to GeoJSON file.
//!
//! ```
//! use std::sync::Arc;
//!
//! use arrow_array::{RecordBatch, StringArray};
//! use arrow_schema::{DataType, Field, Schema};
//! use dissolve_centroids::{dissolve_centroids, Crs, DissolveParams, FeatureTable};
//! use geo_types::{polygon, Geometry};
//!
//! let schema = Arc::new(Schema::new(vec![Field::new("REGION", DataType::Utf8, true)]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(StringArray::from(vec!["A", "B"])) as _],
//! )?;
//! let geometry = vec![
//!     Some(Geometry::Polygon(geo_types::polygon![
//!         (x: 0., y: 0.), (x: 2., y: 0.), (x: 2., y: 2.), (x: 0., y: 2.),
//!     ])),
//!     Some(Geometry::Polygon(geo_types::polygon![
//!         (x: 10., y: 10.), (x: 12., y: 10.), (x: 12., y: 12.), (x: 10., y: 12.),
//!     ])),
//! ];
//! let table = FeatureTable::try_new(batch, geometry, Crs::WGS84)?;
//!
//! let mut params = DissolveParams::new("REGION");
//! params.project_to_wgs84 = false;
//! let points = dissolve_centroids(&table, &params)?;
//! assert_eq!(points.len(), 2);
//! # Ok::<_, dissolve_centroids::error::DissolveError>(())
//! ```

pub mod algorithm;
mod crs;
pub mod error;
mod group;
pub mod io;
mod pipeline;
mod schema;
mod table;

pub use crs::Crs;
pub use group::{distinct_values, select_rows, GroupValue};
pub use pipeline::{dissolve_centroids, run, DissolveParams, GroupSink};
pub use schema::{resolve_output_schema, OutputSchema};
pub use table::FeatureTable;
