mod weighted;

pub use weighted::{PopulationIndex, WeightedPoint};
