use geo::{BoundingRect, Centroid, MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};

/// Coordinate reference system of a set of shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude in degrees, tagged with its EPSG code (4269 = NAD83, 4326 = WGS84).
    Geographic(u32),
    /// USA Contiguous Albers Equal Area Conic (ESRI:102003), in meters.
    EqualArea,
}

/// Envelope of one shape in the R-tree, tagged with the shape's position.
#[derive(Debug, Clone)]
struct ShapeEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope { self.envelope }
}

/// Geometries represents a collection of MultiPolygons indexed by an R-tree of their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<ShapeEnvelope>,
    crs: Crs,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes and shapes with non-finite coordinates are not indexed and never
    /// appear in spatial queries.
    pub(crate) fn new(polygons: Vec<MultiPolygon<f64>>, crs: Crs) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| polygon.bounding_rect().map(|rect| (i, rect)))
                    .filter(|(_, rect)| [rect.min(), rect.max()].iter().all(|c| c.x.is_finite() && c.y.is_finite()))
                    .map(|(i, rect)| ShapeEnvelope {
                        idx: i,
                        envelope: AABB::from_corners(rect.min().into(), rect.max().into()),
                    })
                    .collect()
            ),
            shapes: polygons,
            crs,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Get a single MultiPolygon by index.
    #[inline] pub(crate) fn shape(&self, idx: usize) -> &MultiPolygon<f64> { &self.shapes[idx] }

    #[inline] pub(crate) fn crs(&self) -> Crs { self.crs }

    /// Indices of shapes whose bounding boxes intersect the given envelope.
    #[inline]
    pub(crate) fn query(&self, envelope: &AABB<[f64; 2]>) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(envelope).map(|entry| entry.idx)
    }

    /// Indices of shapes whose bounding boxes intersect the bounding box of `shape`.
    pub(crate) fn candidates(&self, shape: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = shape.bounding_rect() else { return Vec::new() };
        self.query(&AABB::from_corners(rect.min().into(), rect.max().into())).collect()
    }

    /// Area centroid of a single MultiPolygon, or None if it is empty.
    #[inline]
    pub(crate) fn centroid(&self, idx: usize) -> Option<Point<f64>> {
        self.shapes[idx].centroid()
    }
}
