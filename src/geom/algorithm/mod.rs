mod adjacency;
mod overlap;
mod proj;
mod repair;

pub(crate) use overlap::{repaired_intersection, PairwiseOutcome};
pub use overlap::{overlap_fraction, OverlapRecord, SnapThresholds};
pub use repair::repair;
pub(crate) use repair::guarded;
