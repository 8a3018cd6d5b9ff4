use std::collections::HashMap;

use ahash::AHashMap;
use anyhow::{bail, ensure, Result};
use geo::{MultiPolygon, Point};

use crate::{geom::{Crs, Geometries}, types::{GeoId, GeoType, Population, VoterTally}};

/// Census blocks with their race-category populations.
pub type BlockLayer = AreaLayer<Population>;

/// Precincts with their registration tallies; `None` where no record joined.
pub type PrecinctLayer = AreaLayer<Option<VoterTally>>;

/// District boundaries; the district label is the key.
pub type DistrictLayer = AreaLayer<()>;

/// A single layer of keyed areal units, their shapes, and per-unit data.
#[derive(Debug, Clone)]
pub struct AreaLayer<D> {
    ty: GeoType,
    geo_ids: Vec<GeoId>,
    index: AHashMap<GeoId, usize>, // Map between geo_ids and contiguous indices.
    data: Vec<D>,
    geoms: Geometries,
}

impl<D> AreaLayer<D> {
    /// Build a layer from (key, shape, data) triples. Keys must be unique and of type `ty`.
    pub fn new(ty: GeoType, crs: Crs, units: impl IntoIterator<Item = (GeoId, MultiPolygon<f64>, D)>) -> Result<Self> {
        let mut geo_ids = Vec::new();
        let mut shapes = Vec::new();
        let mut data = Vec::new();
        let mut index = AHashMap::new();

        for (geo_id, shape, value) in units {
            ensure!(geo_id.ty() == ty, "[AreaLayer::new] {geo_id} does not belong in a {ty} layer");
            if index.insert(geo_id.clone(), geo_ids.len()).is_some() {
                bail!("[AreaLayer::new] duplicate key {geo_id} in {ty} layer");
            }
            geo_ids.push(geo_id);
            shapes.push(shape);
            data.push(value);
        }

        Ok(Self { ty, geo_ids, index, data, geoms: Geometries::new(shapes, crs) })
    }

    #[inline] pub fn ty(&self) -> GeoType { self.ty }

    #[inline] pub fn len(&self) -> usize { self.geo_ids.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geo_ids.is_empty() }

    #[inline] pub fn crs(&self) -> Crs { self.geoms.crs() }

    #[inline] pub fn geo_ids(&self) -> &[GeoId] { &self.geo_ids }

    #[inline] pub fn geo_id(&self, idx: usize) -> &GeoId { &self.geo_ids[idx] }

    /// Index of the unit with the given key, if present.
    #[inline] pub fn find(&self, geo_id: &GeoId) -> Option<usize> { self.index.get(geo_id).copied() }

    #[inline] pub fn data(&self) -> &[D] { &self.data }

    #[inline] pub fn shape(&self, idx: usize) -> &MultiPolygon<f64> { self.geoms.shape(idx) }

    /// Representative point of a unit (area centroid).
    #[inline] pub fn centroid(&self, idx: usize) -> Option<Point<f64>> { self.geoms.centroid(idx) }

    #[inline] pub(crate) fn geoms(&self) -> &Geometries { &self.geoms }

    /// Reproject the layer into the equal-area CRS.
    pub fn to_equal_area(self) -> Result<Self> {
        let geoms = self.geoms.to_equal_area()?;
        Ok(Self { geoms, ..self })
    }

    /// Fail unless the layer is in the equal-area CRS. Areas and distances in any
    /// other CRS would silently corrupt every overlap fraction and neighborhood.
    pub fn ensure_equal_area(&self) -> Result<()> {
        ensure!(
            self.crs() == Crs::EqualArea,
            "{} layer is in {:?}; reproject it with to_equal_area() first",
            self.ty, self.crs()
        );
        Ok(())
    }
}

impl AreaLayer<()> {
    /// Attach registration tallies to a precinct shape layer by key.
    /// Precincts without a tally become `None`; tallies without a precinct are logged and dropped.
    pub fn join_tallies(self, mut tallies: HashMap<GeoId, VoterTally>) -> Result<PrecinctLayer> {
        ensure!(self.ty == GeoType::Precinct, "[join_tallies] expected a precinct layer, found {}", self.ty);

        let data = self.geo_ids.iter()
            .map(|geo_id| tallies.remove(geo_id))
            .collect::<Vec<_>>();

        let missing = data.iter().filter(|tally| tally.is_none()).count();
        if missing > 0 {
            tracing::warn!(missing, "precincts have no registration record");
        }
        if !tallies.is_empty() {
            tracing::warn!(unmatched = tallies.len(), "registration records match no precinct shape");
        }

        Ok(AreaLayer { ty: self.ty, geo_ids: self.geo_ids, index: self.index, data, geoms: self.geoms })
    }
}
