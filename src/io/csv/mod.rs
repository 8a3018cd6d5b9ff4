//! CSV reading and writing through polars.

mod read;
mod write;

pub use read::{read_block_population, read_block_votes, read_precinct_tallies};
pub use write::{write_block_metrics, write_block_votes};
pub(crate) use write::{metric_columns, voter_column};
