//! Recoverable per-unit errors. Fatal configuration problems use `anyhow` instead.

use crate::types::GeoId;

/// A polygon or polygon pair that could not be measured.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry is empty")]
    Empty,

    #[error("geometry has non-finite coordinates")]
    NonFinite,

    #[error("geometry has zero area after repair")]
    ZeroArea,

    #[error("geometry operation failed: {0}")]
    Operation(String),
}

/// A unit whose dislocation statistics could not be computed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DislocationError {
    #[error("district {0} has no population")]
    EmptyDistrict(GeoId),

    #[error("zero denominator on the {0} axis")]
    ZeroDenominator(&'static str),
}
