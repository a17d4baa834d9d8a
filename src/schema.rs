//! Output-schema resolution: derive the point collection's schema from the
//! source collection and the run parameters.

use arrow_schema::{DataType, FieldRef};

use crate::crs::Crs;
use crate::error::{DissolveError, DissolveResult};
use crate::pipeline::DissolveParams;
use crate::table::FeatureTable;

/// The resolved shape of the output collection: point geometries in `crs`,
/// one attribute field copied from the source group field.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    /// Index of the group field on the source table.
    pub group_index: usize,
    /// The output attribute field: the source field's name, data type and
    /// metadata, with nullability tightened where the run cannot emit nulls.
    pub field: FieldRef,
    /// Spatial reference of the output collection.
    pub crs: Crs,
}

fn groupable(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean | DataType::Int64 | DataType::Float64 | DataType::Utf8
    )
}

/// Resolve the output schema for a run.
///
/// Errors with [`DissolveError::FieldNotFound`] when the group field is
/// absent, [`DissolveError::UnsupportedFieldType`] when its type cannot be
/// grouped, and [`DissolveError::Crs`] when reprojection was requested but
/// the source reference has no route to WGS84 — all fatal before any output
/// exists.
pub fn resolve_output_schema(
    table: &FeatureTable,
    params: &DissolveParams,
) -> DissolveResult<OutputSchema> {
    let (group_index, source_field) = table.field(&params.group_field)?;
    if !groupable(source_field.data_type()) {
        return Err(DissolveError::UnsupportedFieldType(format!(
            "{} ({})",
            source_field.name(),
            source_field.data_type()
        )));
    }

    // The group field is copied verbatim and forced non-nullable, except when
    // the run may legitimately emit the null group: Arrow validates declared
    // nullability against actual null counts.
    let nullable = !params.ignore_nulls && source_field.is_nullable();
    let field: FieldRef = source_field.as_ref().clone().with_nullable(nullable).into();

    let crs = if params.project_to_wgs84 {
        table.crs().wgs84_definition()?;
        Crs::WGS84
    } else {
        table.crs().clone()
    };

    Ok(OutputSchema {
        group_index,
        field,
        crs,
    })
}
