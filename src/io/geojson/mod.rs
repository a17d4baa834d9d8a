//! GeoJSON feature-collection IO.

mod reader;
mod writer;

pub use reader::read_geojson;
pub use writer::{write_geojson, GeoJsonWriter};
