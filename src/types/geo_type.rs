/// Kind of areal unit a key or layer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeoType {
    Precinct,   // Voter-registration unit, keyed by (region, precinct)
    Block,      // Census block, keyed by GISJOIN
    District,   // Legislative district
    Zcta,       // ZIP code tabulation area (downstream roll-ups only)
}

impl GeoType {
    pub fn to_str(&self) -> &'static str {
        match self {
            GeoType::Precinct => "precinct",
            GeoType::Block => "block",
            GeoType::District => "district",
            GeoType::Zcta => "zcta",
        }
    }
}

impl std::fmt::Display for GeoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}
