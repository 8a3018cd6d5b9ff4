mod category;
mod geo_id;
mod geo_type;

pub use category::{Party, Population, Race, VoterTally};
pub use geo_id::GeoId;
pub use geo_type::GeoType;
