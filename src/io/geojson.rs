use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use serde_json::{json, Map, Value};

use crate::{
    apportion::BlockVoteTable,
    layer::BlockLayer,
    metrics::BlockMetrics,
    types::{GeoId, Party, Race},
};
use super::csv::{metric_columns, voter_column};

/// GeoJSON geometry of a MultiPolygon.
fn multipolygon_to_geojson(shape: &MultiPolygon<f64>) -> Value {
    let ring = |ring: &geo::LineString<f64>| ring.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let polygons = shape.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(ring).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// One feature keyed by block, carrying the block's shape (null if the layer lacks it).
fn block_feature(blocks: &BlockLayer, block: &GeoId, mut properties: Map<String, Value>) -> Value {
    properties.insert("GISJOIN".to_string(), json!(block.id()));
    let geometry = blocks.find(block)
        .map(|b| multipolygon_to_geojson(blocks.shape(b)))
        .unwrap_or(Value::Null);

    json!({
        "type": "Feature",
        "id": block.id(),
        "geometry": geometry,
        "properties": properties,
    })
}

fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn write_geojson(value: &Value, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::geojson] Failed to create GeoJSON file: {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("[io::geojson] Failed to write GeoJSON to {:?}", path))
}

/// The block vote table as a GeoJSON FeatureCollection, with the same columns as the CSV.
pub fn block_votes_to_geojson(blocks: &BlockLayer, table: &BlockVoteTable) -> Value {
    let features = table.rows().iter()
        .map(|row| {
            let mut properties = Map::new();
            for race in Race::ALL {
                properties.insert(race.code().to_string(), json!(row.population.get(race)));
            }
            for race in Race::ALL {
                for party in Party::ALL {
                    properties.insert(voter_column(race, party), json!(row.voters.get(race, party)));
                }
            }
            properties.insert("imputed".to_string(), json!(row.imputed));
            block_feature(blocks, &row.block, properties)
        })
        .collect();

    feature_collection(features)
}

/// Write the block vote table with geometry to a GeoJSON file.
pub fn write_block_votes(blocks: &BlockLayer, table: &BlockVoteTable, path: &Path) -> Result<()> {
    write_geojson(&block_votes_to_geojson(blocks, table), path)
}

/// Block metrics as a GeoJSON FeatureCollection, one feature per block with its shape.
pub fn block_metrics_to_geojson(blocks: &BlockLayer, rows: &[BlockMetrics]) -> Value {
    let columns = metric_columns(rows);

    let features = rows.iter().enumerate()
        .map(|(i, row)| {
            let mut properties = Map::new();
            for (name, values) in &columns {
                properties.insert(name.to_string(), json!(values[i]));
            }
            block_feature(blocks, &row.block, properties)
        })
        .collect();

    feature_collection(features)
}

/// Write block metrics with geometry to a GeoJSON file.
pub fn write_block_metrics(blocks: &BlockLayer, rows: &[BlockMetrics], path: &Path) -> Result<()> {
    write_geojson(&block_metrics_to_geojson(blocks, rows), path)
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;
    use crate::{
        apportion::BlockVotes,
        geom::Crs,
        layer::AreaLayer,
        metrics::UdmRecord,
        types::{GeoType, Population, VoterTally},
    };

    #[test]
    fn block_votes_carry_counts_and_geometry() {
        let blocks = AreaLayer::new(GeoType::Block, Crs::EqualArea, [
            (GeoId::new(GeoType::Block, "G1"), MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
            ]]), Population::default()),
        ]).unwrap();
        let mut voters = VoterTally::default();
        voters.set(Race::All, Party::Dem, 25);
        voters.set(Race::Black, Party::Rep, 4);
        let table = BlockVoteTable::new(vec![BlockVotes {
            block: GeoId::new(GeoType::Block, "G1"),
            population: Population::from_components(60.0, 40.0, 0.0, 0.0, 0.0, 0.0),
            voters,
            imputed: true,
        }]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("votes.geojson");
        write_block_votes(&blocks, &table, &path).unwrap();

        let value: Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["id"], "G1");
        assert_eq!(feature["properties"]["GISJOIN"], "G1");
        assert_eq!(feature["properties"]["ALL"], 100.0);
        assert_eq!(feature["properties"]["DEM"], 25);
        assert_eq!(feature["properties"]["REP_B"], 4);
        assert_eq!(feature["properties"]["imputed"], true);
        assert_eq!(feature["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn features_carry_metrics_and_geometry() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
        ]]);
        let blocks = AreaLayer::new(GeoType::Block, Crs::EqualArea, [
            (GeoId::new(GeoType::Block, "G1"), square, Population::default()),
        ]).unwrap();
        let rows = vec![BlockMetrics {
            block: GeoId::new(GeoType::Block, "G1"),
            udm: Some(UdmRecord { block: GeoId::new(GeoType::Block, "G1"), dem: 1.0, rep: 0.5, non_white: 0.0 }),
            opd: None,
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.geojson");
        write_block_metrics(&blocks, &rows, &path).unwrap();

        let value: Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["properties"]["GISJOIN"], "G1");
        assert_eq!(feature["properties"]["udm_dem"], 1.0);
        assert!(feature["properties"]["opd_party"].is_null());
        assert_eq!(feature["geometry"]["type"], "MultiPolygon");
        // One polygon, one closed exterior ring of five positions.
        assert_eq!(feature["geometry"]["coordinates"][0][0].as_array().unwrap().len(), 5);
    }
}
