use geo::{Area, BooleanOps, Centroid, MultiPolygon, Point, Relate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{error::GeometryError, geom::Geometries};
use super::{guarded, repair};

/// Fraction of one polygon's area (`source`) lying inside another (`target`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapRecord {
    pub source: usize,
    pub target: usize,
    pub fraction: f64,
}

/// Classification thresholds applied to raw overlap fractions.
/// Fractions below `low` are noise (0); fractions above `high` are containment (1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapThresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for SnapThresholds {
    fn default() -> Self {
        Self { low: 0.01, high: 0.99 }
    }
}

impl SnapThresholds {
    #[inline]
    pub fn snap(&self, fraction: f64) -> f64 {
        if fraction < self.low { 0.0 }
        else if fraction > self.high { 1.0 }
        else { fraction }
    }
}

/// Fraction of `source`'s area inside `target`, in [0, 1], without snapping.
/// Both shapes are repaired first; full containment short-circuits to exactly 1.
pub fn overlap_fraction(source: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> Result<f64, GeometryError> {
    repaired_overlap_fraction(&repair(source)?, &repair(target)?)
}

/// `overlap_fraction` for shapes that have already been repaired.
pub(crate) fn repaired_overlap_fraction(source: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> Result<f64, GeometryError> {
    guarded(|| {
        let matrix = source.relate(target);
        if matrix.is_within() { return 1.0 }
        if !matrix.is_intersects() { return 0.0 }

        (source.intersection(target).unsigned_area() / source.unsigned_area()).clamp(0.0, 1.0)
    })
}

/// Area fraction and centroid of the piece of `source` inside `target`, or None if
/// the two share no area. Both shapes must already be repaired.
pub(crate) fn repaired_intersection(source: &MultiPolygon<f64>, target: &MultiPolygon<f64>) -> Result<Option<(f64, Point<f64>)>, GeometryError> {
    guarded(|| {
        let matrix = source.relate(target);
        if matrix.is_within() { return source.centroid().map(|centroid| (1.0, centroid)) }
        if !matrix.is_intersects() { return None }

        let piece = source.intersection(target);
        let area = piece.unsigned_area();
        if area <= 0.0 { return None }

        piece.centroid().map(|centroid| ((area / source.unsigned_area()).clamp(0.0, 1.0), centroid))
    })
}

/// Records produced by a pairwise sweep, and what could not be measured.
#[derive(Debug)]
pub(crate) struct PairwiseOutcome<T> {
    pub(crate) records: Vec<T>,
    /// Unrepairable shapes (each counted once) plus pairs whose measurement failed.
    pub(crate) failures: usize,
    /// Sources whose shape could not be repaired, in ascending order.
    pub(crate) broken_sources: Vec<usize>,
    /// Targets whose shape could not be repaired, in ascending order.
    pub(crate) broken_targets: Vec<usize>,
}

fn broken(repaired: &[Option<MultiPolygon<f64>>]) -> Vec<usize> {
    repaired.iter().enumerate()
        .filter_map(|(i, shape)| shape.is_none().then_some(i))
        .collect()
}

impl Geometries {
    /// Repair every shape. Shapes that cannot be healed are logged and yield None.
    fn repaired(&self) -> Vec<Option<MultiPolygon<f64>>> {
        self.shapes().par_iter().enumerate()
            .map(|(i, shape)| repair(shape)
                .inspect_err(|error| tracing::warn!(shape = i, %error, "geometry could not be repaired"))
                .ok())
            .collect()
    }

    /// Measure every (source, target) pair whose bounding boxes intersect, where sources
    /// are `self`'s shapes. Both sides are repaired once up front; a shape that cannot be
    /// repaired takes part in no pair. A pair whose measurement fails is logged, counted,
    /// and skipped; it never aborts the sweep.
    pub(crate) fn pairwise<T, F>(&self, targets: &Geometries, measure: F) -> PairwiseOutcome<T>
    where
        T: Send,
        F: Fn(usize, usize, &MultiPolygon<f64>, &MultiPolygon<f64>) -> Result<Option<T>, GeometryError> + Sync,
    {
        let sources = self.repaired();
        let repaired_targets = targets.repaired();

        let per_target = (0..targets.len()).into_par_iter()
            .map(|t| {
                let mut records = Vec::new();
                let mut failures = 0;
                let Some(target) = &repaired_targets[t] else { return (records, failures) };

                let mut candidates = self.candidates(targets.shape(t));
                candidates.sort_unstable();

                for s in candidates {
                    let Some(source) = &sources[s] else { continue };
                    match measure(s, t, source, target) {
                        Ok(Some(record)) => records.push(record),
                        Ok(None) => {}
                        Err(error) => {
                            tracing::warn!(source = s, target = t, %error, "overlap treated as zero");
                            failures += 1;
                        }
                    }
                }
                (records, failures)
            })
            .collect::<Vec<_>>();

        let broken_sources = broken(&sources);
        let broken_targets = broken(&repaired_targets);

        let failures = broken_sources.len() + broken_targets.len()
            + per_target.iter().map(|(_, failures)| failures).sum::<usize>();
        let records = per_target.into_iter().flat_map(|(records, _)| records).collect();

        PairwiseOutcome { records, failures, broken_sources, broken_targets }
    }

    /// Snapped fraction of each of `self`'s shapes inside each of `targets`' shapes.
    /// Pairs that snap to zero are left out.
    pub(crate) fn overlaps_within(&self, targets: &Geometries, snap: &SnapThresholds) -> PairwiseOutcome<OverlapRecord> {
        self.pairwise(targets, |source_idx, target_idx, source, target| {
            let fraction = snap.snap(repaired_overlap_fraction(source, target)?);
            Ok((fraction > 0.0).then_some(OverlapRecord { source: source_idx, target: target_idx, fraction }))
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;
    use crate::geom::Crs;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
        ]])
    }

    #[test]
    fn contained_polygon_is_exactly_one() {
        assert_eq!(overlap_fraction(&rect(1.0, 1.0, 2.0, 2.0), &rect(0.0, 0.0, 10.0, 10.0)), Ok(1.0));
        // Sharing an edge with the container is still containment.
        assert_eq!(overlap_fraction(&rect(0.0, 0.0, 2.0, 2.0), &rect(0.0, 0.0, 10.0, 10.0)), Ok(1.0));
    }

    #[test]
    fn disjoint_polygons_are_exactly_zero() {
        assert_eq!(overlap_fraction(&rect(0.0, 0.0, 1.0, 1.0), &rect(5.0, 5.0, 6.0, 6.0)), Ok(0.0));
        // Touching along an edge shares no area.
        assert_eq!(overlap_fraction(&rect(0.0, 0.0, 1.0, 1.0), &rect(1.0, 0.0, 2.0, 1.0)), Ok(0.0));
    }

    #[test]
    fn partial_overlap_is_source_relative() {
        let small = rect(0.0, 0.0, 10.0, 10.0);
        let large = rect(7.0, -10.0, 30.0, 30.0);

        let small_in_large = overlap_fraction(&small, &large).unwrap();
        let large_in_small = overlap_fraction(&large, &small).unwrap();

        assert!((small_in_large - 0.3).abs() < 1e-9);
        assert!((large_in_small - 30.0 / 920.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_target_parts_count_once() {
        let target = MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)],
            polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0)],
        ]);
        let fraction = overlap_fraction(&rect(0.5, 0.0, 1.5, 1.0), &target).unwrap();
        assert!((fraction - 1.0).abs() < 1e-9, "fraction = {fraction}");
    }

    #[test]
    fn fractions_stay_in_unit_interval() {
        let shapes = [rect(0.0, 0.0, 4.0, 4.0), rect(2.0, 2.0, 9.0, 3.0), rect(-1.0, -1.0, 1.0, 5.0), rect(3.0, 3.0, 3.5, 3.5)];
        for a in &shapes {
            for b in &shapes {
                let fraction = overlap_fraction(a, b).unwrap();
                assert!((0.0..=1.0).contains(&fraction));
            }
        }
    }

    #[test]
    fn snapping_is_idempotent() {
        let snap = SnapThresholds::default();
        for fraction in [0.0, 0.005, 0.01, 0.3, 0.99, 0.995, 1.0] {
            let once = snap.snap(fraction);
            assert_eq!(snap.snap(once), once);
        }
        assert_eq!(snap.snap(0.005), 0.0);
        assert_eq!(snap.snap(0.995), 1.0);
        assert_eq!(snap.snap(0.5), 0.5);
    }

    #[test]
    fn intersection_piece_has_fraction_and_centroid() {
        let (fraction, centroid) = repaired_intersection(&rect(0.0, 0.0, 10.0, 10.0), &rect(5.0, -5.0, 20.0, 20.0))
            .unwrap()
            .unwrap();
        assert!((fraction - 0.5).abs() < 1e-9);
        assert!((centroid.x() - 7.5).abs() < 1e-9);
        assert!((centroid.y() - 5.0).abs() < 1e-9);

        assert_eq!(repaired_intersection(&rect(0.0, 0.0, 1.0, 1.0), &rect(1.0, 0.0, 2.0, 1.0)), Ok(None));
    }

    #[test]
    fn overlap_sweep_skips_noise_and_bad_geometry() {
        let blocks = Geometries::new(vec![
            rect(0.0, 0.0, 10.0, 10.0),     // inside precinct 0
            rect(9.95, 0.0, 19.95, 10.0),   // 0.5% inside precinct 0, rest in precinct 1
            MultiPolygon::new(vec![polygon![(x: 1.0, y: 1.0), (x: 3.0, y: 1.0), (x: 2.0, y: 1.0)]]),
        ], Crs::EqualArea);
        let precincts = Geometries::new(vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 20.0, 10.0)], Crs::EqualArea);

        let outcome = blocks.overlaps_within(&precincts, &SnapThresholds::default());

        assert_eq!(outcome.records, vec![
            OverlapRecord { source: 0, target: 0, fraction: 1.0 },
            OverlapRecord { source: 1, target: 1, fraction: 1.0 },
        ]);
        // The flat block cannot be repaired and counts once, however many candidates it has.
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.broken_sources, vec![2]);
        assert!(outcome.broken_targets.is_empty());
    }

    #[test]
    fn unrepairable_target_counts_once() {
        let blocks = Geometries::new(vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 2.0, 1.0)], Crs::EqualArea);
        let precincts = Geometries::new(vec![
            MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.5), (x: 2.0, y: 0.5), (x: 1.0, y: 0.5)]]),
            rect(0.0, 0.0, 2.0, 1.0),
        ], Crs::EqualArea);

        let outcome = blocks.overlaps_within(&precincts, &SnapThresholds::default());

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.broken_targets, vec![0]);
    }
}
