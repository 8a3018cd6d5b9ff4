use std::sync::Arc;

use super::geo_type::GeoType;

/// Width that precinct ids are zero-padded to before joining.
const PRECINCT_ID_WIDTH: usize = 6;

/// Stable key for any areal unit.
/// Keeps the source id text (with leading zeros) but avoids repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoId {
    ty: GeoType,
    id: Arc<str>, // e.g., "G37000100001001000" for a block, "WAKE|01-07" for a precinct
}

impl GeoId {
    /// Construct a key verbatim from its id text.
    pub fn new(ty: GeoType, id: &str) -> Self {
        Self { ty, id: Arc::from(id.trim()) }
    }

    /// Construct a precinct key from a region name and a precinct id.
    /// The region is upper-cased and the precinct id left-padded with zeros,
    /// so that registration records and precinct shapes join on the same key.
    pub fn precinct(region: &str, precinct: &str) -> Self {
        let region = region.trim().to_uppercase();
        let precinct = precinct.trim();
        Self {
            ty: GeoType::Precinct,
            id: Arc::from(format!("{region}|{precinct:0>PRECINCT_ID_WIDTH$}")),
        }
    }

    #[inline] pub fn ty(&self) -> GeoType { self.ty }

    #[inline] pub fn id(&self) -> &str { &self.id }
}

impl std::fmt::Display for GeoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ty, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precinct_ids_are_zero_padded() {
        let key = GeoId::precinct("wake ", " 17");
        assert_eq!(key.id(), "WAKE|000017");
        assert_eq!(key.ty(), GeoType::Precinct);
    }

    #[test]
    fn long_precinct_ids_are_kept() {
        assert_eq!(GeoId::precinct("DURHAM", "01-07A").id(), "DURHAM|01-07A");
        assert_eq!(GeoId::precinct("DURHAM", "1234567").id(), "DURHAM|1234567");
    }

    #[test]
    fn padded_and_unpadded_keys_match() {
        assert_eq!(GeoId::precinct("Orange", "42"), GeoId::precinct("ORANGE", "000042"));
    }

    #[test]
    fn block_ids_are_verbatim() {
        let key = GeoId::new(GeoType::Block, "G3700010");
        assert_eq!(key.id(), "G3700010");
        assert_eq!(key.to_string(), "block:G3700010");
    }
}
