//! Areal apportionment of precinct registration tallies onto census blocks.
//!
//! Each block overlapping a precinct receives the precinct's voters in proportion to
//! its overlap-weighted population, one race category at a time. Contributions from
//! every precinct a block straddles are summed.

mod engine;
mod impute;
mod table;

pub use engine::{apportion, Apportionment, PrecinctStatus, PrecinctSummary, VoteShare};
pub use table::{BlockVoteTable, BlockVotes};
