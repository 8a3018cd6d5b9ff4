use ahash::AHashMap;
use geo::Point;
use smallvec::SmallVec;

use crate::{
    apportion::BlockVoteTable,
    geom::{repaired_intersection, PairwiseOutcome},
    layer::{BlockLayer, DistrictLayer},
    report::{FailureKind, StageReport},
};
use super::GroupCounts;

/// The piece of a block inside one district.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Block layer position.
    pub block: usize,
    /// District layer position.
    pub district: usize,
    /// Share of the block's area inside the district (unsnapped).
    pub fraction: f64,
    /// Centroid of the intersection.
    pub centroid: Point<f64>,
    /// Block counts scaled by `fraction`.
    pub counts: GroupCounts,
}

/// Every block ∩ district fragment, with lookups by block and per-district totals.
#[derive(Debug, Clone)]
pub struct Fragments {
    items: Vec<Fragment>,
    blocks: Vec<usize>,
    by_block: AHashMap<usize, SmallVec<[usize; 4]>>, // Most blocks lie in a single district.
    district_totals: Vec<GroupCounts>,
}

impl Fragments {
    /// Cut every apportioned block by the districts it intersects.
    pub fn build(blocks: &BlockLayer, table: &BlockVoteTable, districts: &DistrictLayer) -> (Self, StageReport) {
        let mut report = StageReport::new("fragment");

        let mut counts = vec![None; blocks.len()];
        let mut apportioned = Vec::with_capacity(table.len());
        for row in table.rows() {
            match blocks.find(&row.block) {
                Some(b) => {
                    counts[b] = Some(GroupCounts::from_votes(row));
                    apportioned.push(b);
                }
                None => {
                    tracing::warn!(block = %row.block, "apportioned block has no shape");
                    report.add_failures(FailureKind::MissingJoin, 1);
                }
            }
        }

        let outcome = blocks.geoms().pairwise(districts.geoms(), |b, d, block, district| {
            let Some(block_counts) = counts[b] else { return Ok(None) };
            Ok(repaired_intersection(block, district)?.map(|(fraction, centroid)| Fragment {
                block: b,
                district: d,
                fraction,
                centroid,
                counts: block_counts.scaled(fraction),
            }))
        });
        report.add_failures(FailureKind::Geometry, outcome.failures);

        let PairwiseOutcome { records: mut items, broken_sources, .. } = outcome;
        items.sort_unstable_by_key(|fragment| (fragment.block, fragment.district));

        let mut by_block = AHashMap::<usize, SmallVec<[usize; 4]>>::new();
        let mut district_totals = vec![GroupCounts::default(); districts.len()];
        for (i, fragment) in items.iter().enumerate() {
            by_block.entry(fragment.block).or_default().push(i);
            district_totals[fragment.district] += &fragment.counts;
        }

        let mut placed = Vec::with_capacity(apportioned.len());
        for b in apportioned {
            if broken_sources.binary_search(&b).is_ok() {
                continue // counted as a geometry failure by the sweep
            }
            if by_block.contains_key(&b) {
                placed.push(b);
            } else {
                tracing::warn!(block = %blocks.geo_id(b), "block lies in no district");
                report.add_failures(FailureKind::MissingJoin, 1);
            }
        }
        report.add_processed(placed.len());

        (Self { items, blocks: placed, by_block, district_totals }, report)
    }

    #[inline] pub fn items(&self) -> &[Fragment] { &self.items }

    #[inline] pub fn len(&self) -> usize { self.items.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Block layer positions with at least one fragment, in table order.
    #[inline] pub fn blocks(&self) -> &[usize] { &self.blocks }

    /// Indices into `items()` of the fragments of block `b`.
    pub fn of_block(&self, b: usize) -> &[usize] {
        self.by_block.get(&b).map(|fragments| fragments.as_slice()).unwrap_or(&[])
    }

    /// Sum of the fragment counts falling in district `d`.
    #[inline] pub fn district_total(&self, d: usize) -> &GroupCounts { &self.district_totals[d] }

    /// Sum of the counts of every fragment of block `b`.
    pub fn block_total(&self, b: usize) -> GroupCounts {
        let mut total = GroupCounts::default();
        for &i in self.of_block(b) {
            total += &self.items[i].counts;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::{
        apportion::BlockVotes,
        geom::Crs,
        layer::AreaLayer,
        types::{GeoId, GeoType, Party, Population, Race, VoterTally},
    };

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
        ]])
    }

    #[test]
    fn unrepairable_block_is_a_geometry_failure_only() {
        let flat = MultiPolygon::new(vec![polygon![(x: 1.0, y: 5.0), (x: 3.0, y: 5.0), (x: 2.0, y: 5.0)]]);
        let blocks = AreaLayer::new(GeoType::Block, Crs::EqualArea, [
            (GeoId::new(GeoType::Block, "A"), rect(0.0, 0.0, 10.0, 10.0), Population::default()),
            (GeoId::new(GeoType::Block, "FLAT"), flat, Population::default()),
        ]).unwrap();
        let districts = AreaLayer::new(GeoType::District, Crs::EqualArea, [
            (GeoId::new(GeoType::District, "1"), rect(0.0, 0.0, 10.0, 10.0), ()),
        ]).unwrap();
        let row = |id: &str| BlockVotes {
            block: GeoId::new(GeoType::Block, id),
            population: Population::from_components(10.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            voters: VoterTally::default(),
            imputed: false,
        };
        let table = BlockVoteTable::new(vec![row("A"), row("FLAT")]);

        let (fragments, report) = Fragments::build(&blocks, &table, &districts);

        assert_eq!(fragments.blocks(), &[0]);
        assert_eq!(report.failures(FailureKind::Geometry), 1);
        assert_eq!(report.failures(FailureKind::MissingJoin), 0);
    }

    #[test]
    fn straddling_block_is_cut_by_area() {
        let blocks = AreaLayer::new(GeoType::Block, Crs::EqualArea, [
            (GeoId::new(GeoType::Block, "A"), rect(0.0, 0.0, 10.0, 10.0), Population::default()),
            (GeoId::new(GeoType::Block, "B"), rect(20.0, 0.0, 30.0, 10.0), Population::default()),
            (GeoId::new(GeoType::Block, "OUT"), rect(100.0, 0.0, 110.0, 10.0), Population::default()),
        ]).unwrap();
        let districts = AreaLayer::new(GeoType::District, Crs::EqualArea, [
            (GeoId::new(GeoType::District, "1"), rect(0.0, 0.0, 4.0, 10.0), ()),
            (GeoId::new(GeoType::District, "2"), rect(4.0, 0.0, 40.0, 10.0), ()),
        ]).unwrap();

        let mut voters = VoterTally::default();
        voters.set(Race::All, Party::Dem, 100);
        let row = |id: &str| BlockVotes {
            block: GeoId::new(GeoType::Block, id),
            population: Population::from_components(0.0, 200.0, 0.0, 0.0, 0.0, 0.0),
            voters,
            imputed: false,
        };
        let table = BlockVoteTable::new(vec![row("A"), row("B"), row("OUT"), row("GONE")]);

        let (fragments, report) = Fragments::build(&blocks, &table, &districts);

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments.blocks(), &[0, 1]);
        assert_eq!(fragments.of_block(0).len(), 2);
        assert!(fragments.of_block(2).is_empty());

        let west = &fragments.items()[fragments.of_block(0)[0]];
        assert_eq!(west.district, 0);
        assert!((west.fraction - 0.4).abs() < 1e-9);
        assert!((west.counts.dem - 40.0).abs() < 1e-6);
        assert!((west.centroid.x() - 2.0).abs() < 1e-9);

        assert!((fragments.block_total(0).total - 200.0).abs() < 1e-6);
        assert!((fragments.district_total(1).dem - 160.0).abs() < 1e-6);

        assert_eq!(report.processed(), 2);
        assert_eq!(report.failures(FailureKind::MissingJoin), 2);
    }
}
