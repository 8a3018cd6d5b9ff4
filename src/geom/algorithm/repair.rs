use std::panic::{self, AssertUnwindSafe};

use geo::{Area, BooleanOps, CoordsIter, MultiPolygon};

use crate::error::GeometryError;

/// Heal self-intersections and degenerate rings, the equivalent of a zero-distance buffer.
/// Parts are dissolved one at a time: a single operand is filled even-odd, so each
/// part's rings are rebuilt on its own and overlapping parts merge instead of cancelling.
pub fn repair(shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeometryError> {
    if shape.0.is_empty() { return Err(GeometryError::Empty) }

    if shape.coords_iter().any(|coord| !coord.x.is_finite() || !coord.y.is_finite()) {
        return Err(GeometryError::NonFinite)
    }

    let repaired = guarded(|| shape.0.iter()
        .fold(MultiPolygon::new(vec![]), |dissolved, part| dissolved.union(part)))?;
    if repaired.unsigned_area() <= 0.0 { return Err(GeometryError::ZeroArea) }

    Ok(repaired)
}

/// Run a geometry operation, converting a panic inside the geometry library into an error.
pub(crate) fn guarded<T>(op: impl FnOnce() -> T) -> Result<T, GeometryError> {
    panic::catch_unwind(AssertUnwindSafe(op)).map_err(|payload| {
        let message = payload.downcast_ref::<&str>().map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "geometry operation panicked".to_string());
        GeometryError::Operation(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn repair_heals_bowtie() {
        // Self-intersecting ring: two unit-area triangles with opposite winding.
        let bowtie: MultiPolygon<f64> = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ]]);
        assert!(bowtie.unsigned_area().abs() < 1e-9);

        let repaired = repair(&bowtie).unwrap();
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn repair_keeps_valid_polygon_area() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 3.0), (x: 0.0, y: 3.0),
        ]]);
        assert!((repair(&square).unwrap().unsigned_area() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn repair_merges_overlapping_parts() {
        let parts = MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 0.0, y: 1.0)],
            polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0)],
        ]);
        let repaired = repair(&parts).unwrap();
        assert!((repaired.unsigned_area() - 3.0).abs() < 1e-9);

        // A duplicated part adds no area.
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let duplicated = MultiPolygon::new(vec![square.clone(), square]);
        assert!((repair(&duplicated).unwrap().unsigned_area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repair_rejects_degenerate_input() {
        assert_eq!(repair(&MultiPolygon::new(vec![])), Err(GeometryError::Empty));

        let nan = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0),
        ]]);
        assert_eq!(repair(&nan), Err(GeometryError::NonFinite));

        let flat = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0),
        ]]);
        assert_eq!(repair(&flat), Err(GeometryError::ZeroArea));
    }

    #[test]
    fn guarded_converts_panics() {
        let result: Result<(), _> = guarded(|| panic!("boom"));
        assert_eq!(result, Err(GeometryError::Operation("boom".to_string())));
        assert_eq!(guarded(|| 7), Ok(7));
    }
}
