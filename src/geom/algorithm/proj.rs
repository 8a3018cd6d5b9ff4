use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::geom::{Crs, Geometries};

/// USA Contiguous Albers Equal Area Conic (ESRI:102003).
const EQUAL_AREA_PROJ4: &str =
    "+proj=aea +lat_0=37.5 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs";

/// Build PROJ.4 string for a source geographic CRS (degrees → radians handled in code).
#[inline]
fn source_geog_proj4(epsg: u32) -> Result<&'static str> {
    match epsg {
        4269 | 4937 => Ok("+proj=longlat +datum=NAD83 +no_defs +type=crs"),
        4326 | 4979 => Ok("+proj=longlat +datum=WGS84 +no_defs +type=crs"),
        other => Err(anyhow!("unsupported geographic CRS EPSG:{other}")),
    }
}

impl Geometries {
    /// Reproject shapes from lon/lat to the equal-area CRS used for every area and distance.
    /// Shapes that are already equal-area are returned unchanged.
    pub(crate) fn to_equal_area(&self) -> Result<Geometries> {
        let Crs::Geographic(epsg) = self.crs() else { return Ok(self.clone()) };

        let from = {
            let proj_string = source_geog_proj4(epsg)?;
            Proj4::from_proj_string(proj_string)
                .with_context(|| anyhow!("failed to build source PROJ.4: {proj_string}"))?
        };

        let to = Proj4::from_proj_string(EQUAL_AREA_PROJ4)
            .with_context(|| anyhow!("failed to build target PROJ.4: {EQUAL_AREA_PROJ4}"))?;

        // Map coords → radians in, meters out.
        let projected = self.shapes().iter()
            .enumerate()
            .map(|(i, shape)| shape
                .try_map_coords(|coord: Coord<f64>| {
                    let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
                    transform(&from, &to, &mut point).map(|()| Coord { x: point.0, y: point.1 })
                })
                .with_context(|| format!("CRS transform failed for shape {i}")))
            .collect::<Result<Vec<MultiPolygon<f64>>>>()?;

        Ok(Geometries::new(projected, Crs::EqualArea))
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area, MultiPolygon};

    use super::*;

    #[test]
    fn projection_origin_maps_to_zero() {
        let tiny = MultiPolygon::new(vec![polygon![
            (x: -96.0, y: 37.5), (x: -95.99, y: 37.5), (x: -95.99, y: 37.51), (x: -96.0, y: 37.51),
        ]]);
        let projected = Geometries::new(vec![tiny], Crs::Geographic(4269)).to_equal_area().unwrap();
        assert_eq!(projected.crs(), Crs::EqualArea);

        let first = projected.shape(0).0[0].exterior().0[0];
        assert!(first.x.abs() < 1e-3 && first.y.abs() < 1e-3);

        // 0.01° × 0.01° near 37.5°N is roughly 884 m × 1110 m.
        let area = projected.shape(0).unsigned_area();
        assert!((area - 884.0 * 1110.0).abs() / area < 0.01, "area = {area}");
    }

    #[test]
    fn equal_area_input_is_unchanged() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0),
        ]]);
        let geoms = Geometries::new(vec![square.clone()], Crs::EqualArea);
        assert_eq!(geoms.to_equal_area().unwrap().shape(0), &square);
    }

    #[test]
    fn unknown_source_crs_is_rejected() {
        let geoms = Geometries::new(vec![], Crs::Geographic(3857));
        assert!(geoms.to_equal_area().is_err());
    }
}
