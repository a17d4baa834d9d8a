//! Spatial reference handling.
//!
//! A [`Crs`] wraps an EPSG code. Input collections carry their reference in
//! the legacy GeoJSON `crs` foreign member (the modern GeoJSON spec mandates
//! WGS84, but projected source data in the wild still uses the named-CRS
//! member); a missing member means WGS84.

use geojson::{JsonObject, JsonValue};
use serde_json::json;

use crate::error::{DissolveError, DissolveResult};

/// An EPSG-coded coordinate reference system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    code: u32,
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl Crs {
    /// Geographic longitude/latitude on the WGS84 datum (EPSG:4326).
    pub const WGS84: Crs = Crs { code: 4326 };

    /// Construct from a bare EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self { code }
    }

    /// The EPSG code.
    pub fn epsg(&self) -> u32 {
        self.code
    }

    /// Whether coordinates in this reference are geographic (longitude/latitude
    /// degrees) rather than projected.
    pub fn is_geographic(&self) -> bool {
        // WGS84, NAD83, ETRS89, GDA94: the geographic systems this tool
        // treats as already-in-degrees.
        matches!(self.code, 4326 | 4269 | 4258 | 4283)
    }

    /// Parse a CRS identifier: `EPSG:4326`, `urn:ogc:def:crs:EPSG::3857`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`, `CRS84`, or a bare numeric code.
    pub fn from_user_input(value: &str) -> DissolveResult<Self> {
        let value = value.trim();
        if value.to_ascii_uppercase().ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        let code = value
            .rsplit(':')
            .next()
            .and_then(|tail| tail.parse::<u32>().ok())
            .ok_or_else(|| DissolveError::Crs(format!("unparseable CRS identifier: {value}")))?;
        Ok(Self { code })
    }

    /// Read the `crs` member of a feature collection's foreign members.
    ///
    /// An absent member is the GeoJSON default, WGS84.
    pub(crate) fn from_foreign_members(members: Option<&JsonObject>) -> DissolveResult<Self> {
        let Some(crs) = members.and_then(|m| m.get("crs")) else {
            return Ok(Self::WGS84);
        };
        let name = crs
            .get("properties")
            .and_then(|props| props.get("name"))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DissolveError::Crs(format!("malformed crs member: {crs}")))?;
        Self::from_user_input(name)
    }

    /// The `crs` foreign-member value to write for this reference, or `None`
    /// for WGS84 (the format default carries no member).
    pub(crate) fn foreign_member(&self) -> Option<JsonValue> {
        if *self == Self::WGS84 {
            return None;
        }
        Some(json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", self.code) },
        }))
    }

    /// The [`geodesy`] operator definition whose inverse maps this reference
    /// to WGS84, or `None` when coordinates are already geographic.
    ///
    /// Covers the projections expressible as closed-form geodesy pipelines:
    /// Web Mercator and the UTM zones. Anything else errors, which the
    /// pipeline treats as fatal at setup when reprojection was requested.
    pub fn wgs84_definition(&self) -> DissolveResult<Option<String>> {
        if self.is_geographic() {
            return Ok(None);
        }
        let definition = match self.code {
            3857 => "webmerc".to_string(),
            32601..=32660 => format!("utm zone={}", self.code - 32600),
            32701..=32760 => {
                let zone = self.code - 32700;
                let lon_0 = zone as i32 * 6 - 183;
                format!("tmerc lon_0={lon_0} k_0=0.9996 x_0=500000 y_0=10000000")
            }
            code => {
                return Err(DissolveError::Crs(format!(
                    "no reprojection to WGS84 available for EPSG:{code}"
                )))
            }
        };
        Ok(Some(definition))
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.code)
    }
}
