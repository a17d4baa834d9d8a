//! Defines [`DissolveError`], representing all errors returned by this crate.

use arrow_schema::ArrowError;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DissolveError {
    /// [ArrowError]
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// CRS error
    #[error("CRS related error: {0}")]
    Crs(String),

    /// A group's selection matched no features at aggregation time.
    ///
    /// Recovered per group: the group is skipped and processing continues.
    #[error("group selected no features: {0}")]
    EmptyGroup(String),

    /// The named group field does not exist on the source collection.
    #[error("group field not found: {0}")]
    FieldNotFound(String),

    /// Hull or centroid computation failed for a group.
    ///
    /// Recovered per group: the group is skipped and processing continues.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// [geojson::Error]
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Input that is structurally valid JSON but not a usable feature collection.
    #[error("invalid GeoJSON input: {0}")]
    InvalidGeoJson(String),

    /// [std::io::Error]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The group field has a data type grouping does not support.
    #[error("unsupported group field type: {0}")]
    UnsupportedFieldType(String),
}

/// Crate-specific result type.
pub type DissolveResult<T> = std::result::Result<T, DissolveError>;
