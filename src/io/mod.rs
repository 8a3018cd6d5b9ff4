//! Readers and writers for the file formats the command line consumes and produces.
//!
//! - `csv` - registration tallies, block populations, and the block-level outputs
//! - `shp` - precinct, block and district polygons
//! - `geojson` - block metrics with geometry for downstream spatial joins
//!
//! The library core never touches files; these adapters only build and drain its tables.

pub mod csv;
pub mod geojson;
pub mod shp;
