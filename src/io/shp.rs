//! Polygon layers from ESRI shapefiles.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};

use crate::{
    geom::Crs,
    layer::{AreaLayer, BlockLayer, DistrictLayer},
    types::{GeoId, GeoType, Population},
};

/// Convert a shapefile polygon to a geo MultiPolygon.
/// Shapefiles store each outer ring (clockwise) followed by its holes (counter-clockwise).
pub(crate) fn shp_to_geo(polygon: &shapefile::Polygon) -> MultiPolygon<f64> {
    fn signed_area(coords: &[Coord<f64>]) -> f64 {
        coords.windows(2).map(|w| w[0].x * w[1].y - w[1].x * w[0].y).sum::<f64>() / 2.0
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in polygon.rings() {
        let mut coords = ring.points().iter().map(|point| Coord { x: point.x, y: point.y }).collect::<Vec<_>>();
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }
        let is_exterior = signed_area(&coords) < 0.0;
        let ring = LineString(coords);

        if is_exterior {
            if let Some(previous) = exterior.replace(ring) {
                polygons.push(Polygon::new(previous, std::mem::take(&mut holes)));
            }
        } else {
            holes.push(ring);
        }
    }
    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, holes));
    }

    MultiPolygon(polygons)
}

/// Key fields tried in order for each layer type.
fn key_fields(ty: GeoType) -> &'static [&'static str] {
    match ty {
        GeoType::Block => &["GISJOIN"],
        GeoType::Precinct => &["prec_id", "seims_code", "PREC_ID"],
        GeoType::District => &["DISTRICT", "district", "DISTRICT_C"],
        GeoType::Zcta => &["ZCTA5CE10", "ZCTA5CE20", "GEOID10"],
    }
}

const REGION_FIELDS: &[&str] = &["county_nam", "county", "COUNTY_NAM"];

/// Text of the first present field among `fields`. Numeric keys are written without a fraction.
fn field_text(record: &Record, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(field)? {
        FieldValue::Character(Some(text)) => Some(text.trim().to_string()),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) if n.fract() == 0.0 => Some(format!("{n:.0}")),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => Some(n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Key of one record in a layer of type `ty`.
pub(crate) fn record_key(record: &Record, ty: GeoType) -> Result<GeoId> {
    let Some(id) = field_text(record, key_fields(ty)) else {
        bail!("[io::shp] record has none of the key fields {:?}", key_fields(ty))
    };
    match ty {
        GeoType::Precinct => {
            let Some(region) = field_text(record, REGION_FIELDS) else {
                bail!("[io::shp] precinct record has none of the region fields {:?}", REGION_FIELDS)
            };
            Ok(GeoId::precinct(&region, &id))
        }
        ty => Ok(GeoId::new(ty, &id)),
    }
}

/// Coordinate reference system declared by the `.prj` next to `path`.
/// Without one, coordinates are taken as geographic in `fallback_epsg`.
pub(crate) fn detect_crs(path: &Path, fallback_epsg: u32) -> Result<Crs> {
    let Ok(wkt) = fs::read_to_string(path.with_extension("prj")) else {
        tracing::warn!("{} has no .prj; assuming EPSG:{fallback_epsg}", path.display());
        return Ok(Crs::Geographic(fallback_epsg))
    };
    crs_from_wkt(&wkt, fallback_epsg)
        .with_context(|| format!("[io::shp] unsupported projection in {}", path.with_extension("prj").display()))
}

fn crs_from_wkt(wkt: &str, fallback_epsg: u32) -> Result<Crs> {
    let wkt = wkt.trim();
    if wkt.starts_with("PROJCS") {
        if wkt.contains("Albers") && wkt.contains("North_American_1983") {
            return Ok(Crs::EqualArea)
        }
        bail!("only geographic coordinates or USA Contiguous Albers Equal Area are accepted")
    }
    if wkt.contains("WGS_1984") || wkt.contains("WGS 84") {
        Ok(Crs::Geographic(4326))
    } else if wkt.contains("North_American_1983") || wkt.contains("NAD83") {
        Ok(Crs::Geographic(4269))
    } else {
        Ok(Crs::Geographic(fallback_epsg))
    }
}

/// Read every polygon and its key from a shapefile.
pub fn read_shapes(path: &Path, ty: GeoType, fallback_epsg: u32) -> Result<(Crs, Vec<(GeoId, MultiPolygon<f64>)>)> {
    let crs = detect_crs(path, fallback_epsg)?;
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut units = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.with_context(|| format!("[io::shp] Error reading shape+record in {}", path.display()))?;
        let key = record_key(&record, ty)?;
        let shape = match shape {
            Shape::Polygon(polygon) => shp_to_geo(&polygon),
            Shape::NullShape => {
                tracing::warn!(unit = %key, "null shape; unit has no geometry");
                MultiPolygon::new(vec![])
            }
            other => bail!("[io::shp] found non-Polygon shape in {}: {:?}", path.display(), other.shapetype()),
        };
        units.push((key, shape));
    }
    tracing::info!(units = units.len(), ?crs, "read {ty} shapes from {}", path.display());
    Ok((crs, units))
}

/// Read precinct shapes, ready to be joined with their tallies.
pub fn read_precincts(path: &Path, fallback_epsg: u32) -> Result<AreaLayer<()>> {
    let (crs, units) = read_shapes(path, GeoType::Precinct, fallback_epsg)?;
    AreaLayer::new(GeoType::Precinct, crs, units.into_iter().map(|(key, shape)| (key, shape, ())))
}

/// Read district shapes.
pub fn read_districts(path: &Path, fallback_epsg: u32) -> Result<DistrictLayer> {
    let (crs, units) = read_shapes(path, GeoType::District, fallback_epsg)?;
    AreaLayer::new(GeoType::District, crs, units.into_iter().map(|(key, shape)| (key, shape, ())))
}

/// Read block shapes alone, for stages whose counts come from the block vote table.
pub fn read_block_shapes(path: &Path, fallback_epsg: u32) -> Result<BlockLayer> {
    let (crs, units) = read_shapes(path, GeoType::Block, fallback_epsg)?;
    AreaLayer::new(GeoType::Block, crs, units.into_iter().map(|(key, shape)| (key, shape, Population::default())))
}

/// Read block shapes and attach their populations. Blocks without a population row
/// are logged and given zero population.
pub fn read_blocks(path: &Path, mut populations: HashMap<GeoId, Population>, fallback_epsg: u32) -> Result<BlockLayer> {
    let (crs, units) = read_shapes(path, GeoType::Block, fallback_epsg)?;

    let mut unmatched = 0;
    let units = units.into_iter()
        .map(|(key, shape)| {
            let population = populations.remove(&key).unwrap_or_else(|| {
                unmatched += 1;
                Population::default()
            });
            (key, shape, population)
        })
        .collect::<Vec<_>>();

    if unmatched > 0 {
        tracing::warn!(blocks = unmatched, "blocks have no population row");
    }
    if !populations.is_empty() {
        tracing::warn!(rows = populations.len(), "population rows match no block shape");
    }
    AreaLayer::new(GeoType::Block, crs, units)
}
