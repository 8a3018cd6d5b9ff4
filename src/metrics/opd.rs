use ahash::AHashSet;
use rayon::prelude::*;

use crate::{
    error::DislocationError,
    index::PopulationIndex,
    layer::{BlockLayer, DistrictLayer},
    report::{FailureKind, StageReport},
    types::GeoId,
};
use super::{Fragments, GroupCounts};

/// District proportion minus neighborhood proportion, on three axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dislocation {
    /// DEM / (DEM + REP).
    pub party: f64,
    /// Non-white / total population.
    pub race: f64,
    /// Black DEM / (Black DEM + white REP).
    pub opposed: f64,
}

fn proportion(group: f64, whole: f64, axis: &'static str) -> Result<f64, DislocationError> {
    if whole > 0.0 { Ok(group / whole) } else { Err(DislocationError::ZeroDenominator(axis)) }
}

impl Dislocation {
    /// How far `district`'s composition lies from `neighborhood`'s.
    /// Swapping the arguments negates every axis.
    pub fn between(district: &GroupCounts, neighborhood: &GroupCounts) -> Result<Self, DislocationError> {
        let party = |c: &GroupCounts| proportion(c.dem, c.dem + c.rep, "party");
        let race = |c: &GroupCounts| proportion(c.non_white(), c.total, "race");
        let opposed = |c: &GroupCounts| proportion(c.dem_black, c.dem_black + c.rep_white, "opposed");

        Ok(Self {
            party: party(district)? - party(neighborhood)?,
            race: race(district)? - race(neighborhood)?,
            opposed: opposed(district)? - opposed(neighborhood)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DislocationRecord {
    pub block: GeoId,
    /// Mean neighborhood aggregate over the block's fragments.
    pub neighborhood: GroupCounts,
    /// Mean enclosing-district aggregate over the block's fragments.
    pub district: GroupCounts,
    pub dislocation: Dislocation,
}

/// District and neighborhood aggregates seen from one fragment.
fn fragment_aggregates(
    fragments: &Fragments,
    index: &PopulationIndex,
    districts: &DistrictLayer,
    i: usize,
) -> Result<(GroupCounts, GroupCounts), DislocationError> {
    let fragment = &fragments.items()[i];
    let district = *fragments.district_total(fragment.district);

    let k = district.total.round();
    if k < 1.0 {
        return Err(DislocationError::EmptyDistrict(districts.geo_id(fragment.district).clone()))
    }

    let owners = index.k_nearest(fragment.centroid, k as u64).into_iter()
        .map(|(j, _)| fragments.items()[j].block)
        .collect::<AHashSet<_>>();

    let mut neighborhood = GroupCounts::default();
    for b in owners {
        neighborhood += &fragments.block_total(b);
    }
    Ok((district, neighborhood))
}

/// OPD of every block with fragments. Each fragment is compared with a neighborhood
/// holding as many people as its district; the block averages its fragments.
/// Fragments in an empty district, and blocks with a zero denominator, are skipped.
pub fn compute_opd(blocks: &BlockLayer, districts: &DistrictLayer, fragments: &Fragments) -> (Vec<DislocationRecord>, StageReport) {
    let index = PopulationIndex::new(
        fragments.items().iter().enumerate().map(|(i, fragment)| (i, fragment.centroid, fragment.counts.total))
    );

    let results = fragments.blocks().par_iter()
        .map(|&b| {
            let mut district = GroupCounts::default();
            let mut neighborhood = GroupCounts::default();
            let mut used = 0;
            let mut empty = 0;

            for &i in fragments.of_block(b) {
                match fragment_aggregates(fragments, &index, districts, i) {
                    Ok((d, n)) => {
                        district += &d;
                        neighborhood += &n;
                        used += 1;
                    }
                    Err(error) => {
                        tracing::warn!(block = %blocks.geo_id(b), %error, "OPD fragment skipped");
                        empty += 1;
                    }
                }
            }
            if used == 0 {
                return (None, empty)
            }

            let district = district / used as f64;
            let neighborhood = neighborhood / used as f64;
            match Dislocation::between(&district, &neighborhood) {
                Ok(dislocation) => {
                    let record = DislocationRecord { block: blocks.geo_id(b).clone(), neighborhood, district, dislocation };
                    (Some(record), empty)
                }
                Err(error) => {
                    tracing::warn!(block = %blocks.geo_id(b), %error, "OPD block skipped");
                    (None, empty + 1)
                }
            }
        })
        .collect::<Vec<_>>();

    let mut report = StageReport::new("opd");
    let mut records = Vec::with_capacity(results.len());
    let mut degenerate = 0;
    for (record, failures) in results {
        degenerate += failures;
        records.extend(record);
    }
    report.add_processed(records.len());
    report.add_failures(FailureKind::DegenerateDenominator, degenerate);
    (records, report)
}
