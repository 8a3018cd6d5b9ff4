//! Localized dislocation metrics over apportioned blocks.
//!
//! Blocks are first cut by district boundaries into fragments. UDM measures how
//! unpredictable the district label of nearby same-affinity voters is; OPD compares a
//! district's composition with that of an equally populous neighborhood.

mod fragment;
mod opd;
mod udm;

use std::ops::{AddAssign, Div};

use ahash::AHashMap;
use anyhow::{ensure, Result};

use crate::{
    apportion::{BlockVoteTable, BlockVotes},
    config::MetricsConfig,
    layer::{BlockLayer, DistrictLayer},
    report::StageReport,
    types::{GeoId, GeoType, Party, Race},
};

pub use fragment::{Fragment, Fragments};
pub use opd::{compute_opd, Dislocation, DislocationRecord};
pub use udm::{compute_udm, shannon_entropy, UdmRecord};

/// Counts the metrics look at, for a block, a fragment, or an aggregate of either.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupCounts {
    pub total: f64,
    pub white: f64,
    pub dem: f64,
    pub rep: f64,
    pub dem_black: f64,
    pub rep_white: f64,
}

impl GroupCounts {
    pub fn from_votes(votes: &BlockVotes) -> Self {
        Self {
            total: votes.population.get(Race::All),
            white: votes.population.get(Race::White),
            dem: votes.voters.party_total(Party::Dem) as f64,
            rep: votes.voters.party_total(Party::Rep) as f64,
            dem_black: votes.voters.get(Race::Black, Party::Dem) as f64,
            rep_white: votes.voters.get(Race::White, Party::Rep) as f64,
        }
    }

    #[inline] pub fn non_white(&self) -> f64 { (self.total - self.white).max(0.0) }

    pub fn scaled(&self, fraction: f64) -> Self {
        Self {
            total: self.total * fraction,
            white: self.white * fraction,
            dem: self.dem * fraction,
            rep: self.rep * fraction,
            dem_black: self.dem_black * fraction,
            rep_white: self.rep_white * fraction,
        }
    }
}

impl AddAssign<&GroupCounts> for GroupCounts {
    fn add_assign(&mut self, other: &GroupCounts) {
        self.total += other.total;
        self.white += other.white;
        self.dem += other.dem;
        self.rep += other.rep;
        self.dem_black += other.dem_black;
        self.rep_white += other.rep_white;
    }
}

impl Div<f64> for GroupCounts {
    type Output = GroupCounts;

    fn div(self, n: f64) -> GroupCounts { self.scaled(1.0 / n) }
}

/// Metrics of one block; a metric that was not requested is None.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMetrics {
    pub block: GeoId,
    pub udm: Option<UdmRecord>,
    pub opd: Option<DislocationRecord>,
}

#[derive(Debug)]
pub struct MetricsOutput {
    pub udm: Option<Vec<UdmRecord>>,
    pub opd: Option<Vec<DislocationRecord>>,
    pub reports: Vec<StageReport>,
}

impl MetricsOutput {
    /// One row per block. With both metrics requested, only blocks that have both appear.
    pub fn blocks(&self) -> Vec<BlockMetrics> {
        match (&self.udm, &self.opd) {
            (Some(udm), Some(opd)) => {
                let opd = opd.iter().map(|record| (&record.block, record)).collect::<AHashMap<_, _>>();
                udm.iter()
                    .filter_map(|record| opd.get(&record.block).map(|&dislocation| BlockMetrics {
                        block: record.block.clone(),
                        udm: Some(record.clone()),
                        opd: Some(dislocation.clone()),
                    }))
                    .collect()
            }
            (Some(udm), None) => udm.iter()
                .map(|record| BlockMetrics { block: record.block.clone(), udm: Some(record.clone()), opd: None })
                .collect(),
            (None, Some(opd)) => opd.iter()
                .map(|record| BlockMetrics { block: record.block.clone(), udm: None, opd: Some(record.clone()) })
                .collect(),
            (None, None) => Vec::new(),
        }
    }
}

/// Compute the requested metrics for every apportioned block.
pub fn compute_metrics(blocks: &BlockLayer, table: &BlockVoteTable, districts: &DistrictLayer, config: &MetricsConfig) -> Result<MetricsOutput> {
    config.validate()?;
    ensure!(blocks.ty() == GeoType::Block, "[compute_metrics] expected a block layer, found {}", blocks.ty());
    ensure!(districts.ty() == GeoType::District, "[compute_metrics] expected a district layer, found {}", districts.ty());
    blocks.ensure_equal_area()?;
    districts.ensure_equal_area()?;

    let (fragments, fragment_report) = Fragments::build(blocks, table, districts);
    fragment_report.log();
    let mut reports = vec![fragment_report];

    let udm = if config.udm {
        let (records, report) = compute_udm(blocks, &fragments, config.radius()?);
        report.log();
        reports.push(report);
        Some(records)
    } else { None };

    let opd = if config.opd {
        let (records, report) = compute_opd(blocks, districts, &fragments);
        report.log();
        reports.push(report);
        Some(records)
    } else { None };

    Ok(MetricsOutput { udm, opd, reports })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udm(block: &str) -> UdmRecord {
        UdmRecord { block: GeoId::new(GeoType::Block, block), dem: 0.0, rep: 0.0, non_white: 0.0 }
    }

    fn opd(block: &str) -> DislocationRecord {
        DislocationRecord {
            block: GeoId::new(GeoType::Block, block),
            neighborhood: GroupCounts::default(),
            district: GroupCounts::default(),
            dislocation: Dislocation { party: 0.0, race: 0.0, opposed: 0.0 },
        }
    }

    #[test]
    fn both_metrics_join_on_blocks_with_both() {
        let output = MetricsOutput {
            udm: Some(vec![udm("A"), udm("B")]),
            opd: Some(vec![opd("B"), opd("C")]),
            reports: Vec::new(),
        };
        let joined = output.blocks();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].block, GeoId::new(GeoType::Block, "B"));

        let only_udm = MetricsOutput { udm: Some(vec![udm("A"), udm("B")]), opd: None, reports: Vec::new() };
        assert_eq!(only_udm.blocks().len(), 2);
    }

    #[test]
    fn counts_average_and_clamp_non_white() {
        let mut sum = GroupCounts { total: 10.0, white: 4.0, dem: 2.0, ..Default::default() };
        sum += &GroupCounts { total: 20.0, white: 30.0, dem: 4.0, ..Default::default() };
        let mean = sum / 2.0;
        assert_eq!(mean.total, 15.0);
        assert_eq!(mean.dem, 3.0);
        assert_eq!(GroupCounts { total: 1.0, white: 2.0, ..Default::default() }.non_white(), 0.0);
    }
}
