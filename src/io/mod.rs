//! Reading and writing feature collections.

pub mod geojson;
