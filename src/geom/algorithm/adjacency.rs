use geo::Relate;

use crate::geom::Geometries;
use super::guarded;

impl Geometries {
    /// Indices of shapes that touch or overlap shape `idx`, excluding `idx` itself.
    /// Real boundary layers rarely meet exactly, so overlapping neighbors count as adjacent.
    /// Pairs whose relation cannot be computed are logged and left out.
    pub(crate) fn neighbors(&self, idx: usize) -> Vec<usize> {
        let shape = self.shape(idx);
        let mut neighbors = self.candidates(shape).into_iter()
            .filter(|&other| other != idx)
            .filter(|&other| match guarded(|| shape.relate(self.shape(other)).is_intersects()) {
                Ok(adjacent) => adjacent,
                Err(error) => {
                    tracing::warn!(shape = idx, other, %error, "adjacency test failed");
                    false
                }
            })
            .collect::<Vec<_>>();
        neighbors.sort_unstable();
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use crate::geom::{Crs, Geometries};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
        ]])
    }

    #[test]
    fn neighbors_share_an_edge_or_corner() {
        // 0 | 1
        // --+--
        // 2 | 3      and a distant 4
        let geoms = Geometries::new(vec![
            rect(0.0, 1.0, 1.0, 2.0),
            rect(1.0, 1.0, 2.0, 2.0),
            rect(0.0, 0.0, 1.0, 1.0),
            rect(1.0, 0.0, 2.0, 1.0),
            rect(5.0, 5.0, 6.0, 6.0),
        ], Crs::EqualArea);

        assert_eq!(geoms.neighbors(0), vec![1, 2, 3]);
        assert_eq!(geoms.neighbors(3), vec![0, 1, 2]);
        assert!(geoms.neighbors(4).is_empty());
    }
}
