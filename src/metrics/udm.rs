use ahash::AHashMap;
use rayon::prelude::*;

use crate::{
    index::PopulationIndex,
    layer::BlockLayer,
    report::{FailureKind, StageReport},
    types::GeoId,
};
use super::{Fragments, GroupCounts};

/// Uncertainty of district membership of one block, per affinity group.
#[derive(Debug, Clone, PartialEq)]
pub struct UdmRecord {
    pub block: GeoId,
    pub dem: f64,
    pub rep: f64,
    pub non_white: f64,
}

/// Shannon entropy, in bits, of a distribution given as counts. Zero when empty.
pub fn shannon_entropy(counts: impl IntoIterator<Item = u64>) -> f64 {
    let counts = counts.into_iter().filter(|&n| n > 0).collect::<Vec<_>>();
    let total = counts.iter().sum::<u64>() as f64;
    if total == 0.0 { return 0.0 }

    -counts.into_iter()
        .map(|n| {
            let p = n as f64 / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Entropy of the district labels carried by everyone within `radius` of `at`.
fn district_entropy(index: &PopulationIndex, fragments: &Fragments, at: geo::Point<f64>, radius: f64) -> f64 {
    let mut by_district = AHashMap::<usize, u64>::new();
    for (i, people) in index.within_radius(at, radius) {
        *by_district.entry(fragments.items()[i].district).or_default() += people;
    }
    shannon_entropy(by_district.into_values())
}

/// UDM of every block with fragments, using the block centroid as the search center.
/// Each fragment stands for its whole-person counts. A block with no same-affinity
/// neighbor within the radius scores 0.
pub fn compute_udm(blocks: &BlockLayer, fragments: &Fragments, radius: f64) -> (Vec<UdmRecord>, StageReport) {
    let category_index = |count: fn(&GroupCounts) -> f64| PopulationIndex::new(
        fragments.items().iter().enumerate().map(|(i, fragment)| (i, fragment.centroid, count(&fragment.counts)))
    );
    let dem = category_index(|counts| counts.dem.trunc());
    let rep = category_index(|counts| counts.rep.trunc());
    let non_white = category_index(|counts| (counts.total.trunc() - counts.white.trunc()).max(0.0));

    let results = fragments.blocks().par_iter()
        .map(|&b| {
            let at = blocks.centroid(b)?;
            Some(UdmRecord {
                block: blocks.geo_id(b).clone(),
                dem: district_entropy(&dem, fragments, at, radius),
                rep: district_entropy(&rep, fragments, at, radius),
                non_white: district_entropy(&non_white, fragments, at, radius),
            })
        })
        .collect::<Vec<_>>();

    let mut report = StageReport::new("udm");
    let records = results.into_iter().flatten().collect::<Vec<_>>();
    report.add_processed(records.len());
    report.add_failures(FailureKind::Geometry, fragments.blocks().len() - records.len());
    (records, report)
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::{
        apportion::{BlockVoteTable, BlockVotes},
        geom::Crs,
        layer::AreaLayer,
        types::{GeoType, Party, Population, Race, VoterTally},
    };

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
        ]])
    }

    #[test]
    fn entropy_of_known_distributions() {
        assert_eq!(shannon_entropy(Vec::new()), 0.0);
        assert_eq!(shannon_entropy([0, 0]), 0.0);
        assert_eq!(shannon_entropy([42]), 0.0);
        assert!((shannon_entropy([5, 5]) - 1.0).abs() < 1e-12);
        assert!((shannon_entropy([1, 1, 1, 1]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_is_bounded_by_distinct_labels() {
        for counts in [vec![1, 2, 3], vec![100, 1], vec![7, 7, 7, 0, 2], vec![1, 1000, 13, 9]] {
            let distinct = counts.iter().filter(|&&n| n > 0).count() as f64;
            let entropy = shannon_entropy(counts.iter().copied());
            assert!(entropy >= 0.0);
            assert!(entropy <= distinct.log2() + 1e-12);
        }
    }

    /// Two blocks on either side of a district line, 10 m apart, and one block far away.
    fn scenario() -> (BlockLayer, Fragments) {
        let blocks = AreaLayer::new(GeoType::Block, Crs::EqualArea, [
            (GeoId::new(GeoType::Block, "W"), rect(0.0, 0.0, 10.0, 10.0), Population::default()),
            (GeoId::new(GeoType::Block, "E"), rect(10.0, 0.0, 20.0, 10.0), Population::default()),
            (GeoId::new(GeoType::Block, "FAR"), rect(1000.0, 0.0, 1010.0, 10.0), Population::default()),
        ]).unwrap();
        let districts = AreaLayer::new(GeoType::District, Crs::EqualArea, [
            (GeoId::new(GeoType::District, "1"), rect(0.0, 0.0, 10.0, 10.0), ()),
            (GeoId::new(GeoType::District, "2"), rect(10.0, 0.0, 2000.0, 10.0), ()),
        ]).unwrap();

        let row = |id: &str, dem: u64, rep: u64, white: f64| {
            let mut voters = VoterTally::default();
            voters.set(Race::All, Party::Dem, dem);
            voters.set(Race::All, Party::Rep, rep);
            BlockVotes {
                block: GeoId::new(GeoType::Block, id),
                population: Population::from_components(white, 0.0, 0.0, 0.0, 0.0, 0.0),
                voters,
                imputed: false,
            }
        };
        let table = BlockVoteTable::new(vec![row("W", 10, 0, 20.0), row("E", 10, 0, 20.0), row("FAR", 3, 0, 5.0)]);
        let (fragments, _) = Fragments::build(&blocks, &table, &districts);
        (blocks, fragments)
    }

    #[test]
    fn split_neighborhood_has_one_bit_of_entropy() {
        let (blocks, fragments) = scenario();
        let (records, report) = compute_udm(&blocks, &fragments, 15.0);

        assert_eq!(records.len(), 3);
        assert_eq!(report.skipped(), 0);
        // Equal numbers of Democrats on both sides of the line.
        assert!((records[0].dem - 1.0).abs() < 1e-12);
        assert!((records[1].dem - 1.0).abs() < 1e-12);
        // The distant block only sees itself.
        assert_eq!(records[2].dem, 0.0);
    }

    #[test]
    fn no_same_affinity_neighbor_scores_zero() {
        let (blocks, fragments) = scenario();
        let (records, _) = compute_udm(&blocks, &fragments, 15.0);
        // Nobody is registered Republican and everyone is white.
        for record in &records {
            assert_eq!(record.rep, 0.0);
            assert_eq!(record.non_white, 0.0);
        }
    }
}
