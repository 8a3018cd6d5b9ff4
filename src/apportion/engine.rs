use ahash::AHashMap;
use anyhow::{ensure, Result};
use rayon::prelude::*;

use crate::{
    config::ApportionConfig,
    layer::{BlockLayer, PrecinctLayer},
    report::{FailureKind, StageReport},
    types::{GeoId, GeoType, Party, Population, Race, VoterTally},
};
use super::{impute, table::{BlockVoteTable, Contribution}};

/// Voters per person of each (race, party) cell of one precinct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteShare([[f64; Party::COUNT]; Race::COUNT]);

impl VoteShare {
    /// Share of `voters` over `population`, per race. A category whose population is
    /// below one person divides by one, so its share is the raw voter count.
    pub fn from_totals(voters: &VoterTally, population: &Population) -> Self {
        let mut share = [[0.0; Party::COUNT]; Race::COUNT];
        for race in Race::ALL {
            let denominator = population.get(race).max(1.0);
            for party in Party::ALL {
                share[race.idx()][party.idx()] = voters.get(race, party) as f64 / denominator;
            }
        }
        Self(share)
    }

    #[inline]
    pub fn get(&self, race: Race, party: Party) -> f64 { self.0[race.idx()][party.idx()] }

    /// Estimated voters of a population: population × share, rounded half to even.
    pub fn estimate(&self, population: &Population) -> VoterTally {
        let mut voters = VoterTally::default();
        for race in Race::ALL {
            for party in Party::ALL {
                let estimate = (population.get(race) * self.get(race, party)).round_ties_even();
                voters.set(race, party, estimate.max(0.0) as u64);
            }
        }
        voters
    }
}

/// Blocks overlapping one precinct with their overlap-weighted populations.
#[derive(Debug, Clone, Default)]
pub(super) struct PrecinctBlocks {
    pub(super) members: Vec<(usize, Population)>,
    pub(super) total: Population,
}

impl PrecinctBlocks {
    fn gather(overlaps: Vec<(usize, f64)>, populations: &[Population]) -> Self {
        let mut total = Population::default();
        let members = overlaps.into_iter()
            .map(|(block, fraction)| {
                let effective = populations[block].scaled(fraction);
                total += &effective;
                (block, effective)
            })
            .collect();
        Self { members, total }
    }

    #[inline] pub(super) fn is_empty(&self) -> bool { self.members.is_empty() }

    fn distribute(&self, share: &VoteShare, imputed: bool) -> Vec<Contribution> {
        self.members.iter()
            .map(|&(block, population)| Contribution { block, population, voters: share.estimate(&population), imputed })
            .collect()
    }
}

/// How a precinct took part in apportionment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecinctStatus {
    /// Distributed from its own tally.
    Direct,
    /// No tally; distributed from a share pooled over its touching neighbors.
    Imputed,
    /// No tally and no substitute; its blocks received nothing from it.
    Missing,
    /// Overlaps no block.
    Empty,
    /// Its shape could not be repaired; it took no part in the overlap sweep.
    InvalidGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecinctSummary {
    pub precinct: GeoId,
    pub blocks: usize,
    /// Overlap-weighted population of the precinct's blocks.
    pub population: f64,
    pub status: PrecinctStatus,
}

/// Result of an apportionment run.
#[derive(Debug)]
pub struct Apportionment {
    pub table: BlockVoteTable,
    pub precincts: Vec<PrecinctSummary>,
    pub report: StageReport,
}

impl Apportionment {
    /// Precincts whose blocks were excluded for lack of a tally.
    pub fn missing(&self) -> impl Iterator<Item = &GeoId> + '_ {
        self.precincts.iter()
            .filter(|summary| summary.status == PrecinctStatus::Missing)
            .map(|summary| &summary.precinct)
    }
}

/// Apportion every precinct's tally onto the blocks it overlaps.
pub fn apportion(blocks: &BlockLayer, precincts: &PrecinctLayer, config: &ApportionConfig) -> Result<Apportionment> {
    config.validate()?;
    ensure!(blocks.ty() == GeoType::Block, "[apportion] expected a block layer, found {}", blocks.ty());
    ensure!(precincts.ty() == GeoType::Precinct, "[apportion] expected a precinct layer, found {}", precincts.ty());
    blocks.ensure_equal_area()?;
    precincts.ensure_equal_area()?;

    tracing::info!(blocks = blocks.len(), precincts = precincts.len(), "computing block/precinct overlaps");
    let overlaps = blocks.geoms().overlaps_within(precincts.geoms(), &config.snap);

    let mut report = StageReport::new("apportion");
    report.add_failures(FailureKind::Geometry, overlaps.failures);

    let mut grouped = vec![Vec::new(); precincts.len()];
    for record in &overlaps.records {
        grouped[record.target].push((record.source, record.fraction));
    }
    let mut invalid = vec![false; precincts.len()];
    for &p in &overlaps.broken_targets {
        invalid[p] = true;
    }

    let gathered = grouped.into_par_iter()
        .map(|overlaps| PrecinctBlocks::gather(overlaps, blocks.data()))
        .collect::<Vec<_>>();

    let substitutes = if config.impute {
        impute::substitute_shares(precincts, &gathered)
    } else {
        AHashMap::new()
    };

    let outcomes = gathered.par_iter().enumerate()
        .map(|(p, members)| {
            if invalid[p] {
                return (PrecinctStatus::InvalidGeometry, Vec::new())
            }
            if members.is_empty() {
                return (PrecinctStatus::Empty, Vec::new())
            }
            match (&precincts.data()[p], substitutes.get(&p)) {
                (Some(tally), _) => {
                    let share = VoteShare::from_totals(tally, &members.total);
                    (PrecinctStatus::Direct, members.distribute(&share, false))
                }
                (None, Some(share)) => (PrecinctStatus::Imputed, members.distribute(share, true)),
                (None, None) => (PrecinctStatus::Missing, Vec::new()),
            }
        })
        .collect::<Vec<_>>();

    let mut summaries = Vec::with_capacity(precincts.len());
    let mut contributions = Vec::new();
    for (p, (status, rows)) in outcomes.into_iter().enumerate() {
        match status {
            PrecinctStatus::Direct | PrecinctStatus::Imputed => report.add_processed(1),
            PrecinctStatus::Missing => {
                tracing::warn!(precinct = %precincts.geo_id(p), "precinct has no tally; its blocks are excluded");
                report.add_failures(FailureKind::MissingJoin, 1);
            }
            PrecinctStatus::Empty => {
                tracing::warn!(precinct = %precincts.geo_id(p), "precinct overlaps no block");
                report.add_failures(FailureKind::MissingJoin, 1);
            }
            PrecinctStatus::InvalidGeometry => {} // counted by the overlap sweep
        }
        summaries.push(PrecinctSummary {
            precinct: precincts.geo_id(p).clone(),
            blocks: gathered[p].members.len(),
            population: gathered[p].total.total(),
            status,
        });
        contributions.extend(rows);
    }

    let table = BlockVoteTable::assemble(blocks, contributions);
    tracing::info!(blocks = table.len(), "assembled block vote table");
    report.log();

    Ok(Apportionment { table, precincts: summaries, report })
}
