mod algorithm;
mod geom;

pub(crate) use algorithm::{repaired_intersection, PairwiseOutcome};
pub use algorithm::{overlap_fraction, repair, OverlapRecord, SnapThresholds};
pub use geom::Crs;
pub(crate) use geom::Geometries;
