use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A unit's representative point carrying its population as mass.
/// One entry stands for `mass` people at the same location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub unit: usize,
    pub coord: [f64; 2],
    pub mass: u64,
}

impl RTreeObject for WeightedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.coord)
    }
}

impl PointDistance for WeightedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.coord[0] - point[0];
        let dy = self.coord[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Nearest-neighbor index in which density reflects population rather than unit count.
/// Queries answer in people: "the k nearest people" and "everyone within r".
#[derive(Debug, Clone)]
pub struct PopulationIndex {
    rtree: RTree<WeightedPoint>,
    total: u64,
}

impl PopulationIndex {
    /// Build from (unit, representative point, population). Populations are rounded to
    /// whole people; units with no people or a non-finite location are not indexed.
    pub fn new(units: impl IntoIterator<Item = (usize, Point<f64>, f64)>) -> Self {
        let points = units.into_iter()
            .filter(|(_, at, _)| at.x().is_finite() && at.y().is_finite())
            .filter_map(|(unit, at, population)| {
                let mass = population.max(0.0).round() as u64;
                (mass > 0).then_some(WeightedPoint { unit, coord: [at.x(), at.y()], mass })
            })
            .collect::<Vec<_>>();

        let total = points.iter().map(|point| point.mass).sum();
        Self { rtree: RTree::bulk_load(points), total }
    }

    /// Number of people indexed.
    #[inline] pub fn total_population(&self) -> u64 { self.total }

    /// Number of units indexed.
    #[inline] pub fn len(&self) -> usize { self.rtree.size() }

    #[inline] pub fn is_empty(&self) -> bool { self.rtree.size() == 0 }

    /// The `k` people nearest to `at`, as (unit, people taken) in order of distance.
    /// The farthest unit may be taken only in part. Returns everyone if fewer than `k` are indexed.
    pub fn k_nearest(&self, at: Point<f64>, k: u64) -> Vec<(usize, u64)> {
        let mut remaining = k;
        let mut nearest = Vec::new();
        for point in self.rtree.nearest_neighbor_iter(&[at.x(), at.y()]) {
            if remaining == 0 { break }
            let taken = point.mass.min(remaining);
            nearest.push((point.unit, taken));
            remaining -= taken;
        }
        nearest
    }

    /// Every unit within `radius` of `at`, as (unit, people), ordered by unit.
    pub fn within_radius(&self, at: Point<f64>, radius: f64) -> Vec<(usize, u64)> {
        let mut within = self.rtree.locate_within_distance([at.x(), at.y()], radius * radius)
            .map(|point| (point.unit, point.mass))
            .collect::<Vec<_>>();
        within.sort_unstable();
        within
    }
}
