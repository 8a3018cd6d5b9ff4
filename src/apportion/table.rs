use ahash::AHashMap;

use crate::{layer::BlockLayer, types::{GeoId, Population, VoterTally}};

/// One precinct's contribution to one block.
#[derive(Debug, Clone, Copy)]
pub(super) struct Contribution {
    pub(super) block: usize,
    pub(super) population: Population,
    pub(super) voters: VoterTally,
    pub(super) imputed: bool,
}

/// Apportioned counts of one block, summed over every precinct it overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockVotes {
    pub block: GeoId,
    /// Overlap-weighted population received from contributing precincts.
    pub population: Population,
    pub voters: VoterTally,
    /// True if any contribution came from an imputed share.
    pub imputed: bool,
}

/// Block-level apportionment output, ordered by block layer position.
#[derive(Debug, Clone, Default)]
pub struct BlockVoteTable {
    rows: Vec<BlockVotes>,
    index: AHashMap<GeoId, usize>,
}

impl BlockVoteTable {
    pub fn new(rows: Vec<BlockVotes>) -> Self {
        let index = rows.iter().enumerate().map(|(i, row)| (row.block.clone(), i)).collect();
        Self { rows, index }
    }

    /// Sum contributions per block. Blocks that received none are left out.
    pub(super) fn assemble(blocks: &BlockLayer, contributions: Vec<Contribution>) -> Self {
        let mut merged: Vec<Option<BlockVotes>> = vec![None; blocks.len()];
        for contribution in contributions {
            let row = merged[contribution.block].get_or_insert_with(|| BlockVotes {
                block: blocks.geo_id(contribution.block).clone(),
                population: Population::default(),
                voters: VoterTally::default(),
                imputed: false,
            });
            row.population += &contribution.population;
            row.voters += &contribution.voters;
            row.imputed |= contribution.imputed;
        }
        Self::new(merged.into_iter().flatten().collect())
    }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn rows(&self) -> &[BlockVotes] { &self.rows }

    pub fn get(&self, block: &GeoId) -> Option<&BlockVotes> {
        self.index.get(block).map(|&i| &self.rows[i])
    }
}
