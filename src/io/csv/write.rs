//! CSV writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter}};

use crate::{
    apportion::BlockVoteTable,
    metrics::{BlockMetrics, Dislocation, GroupCounts, UdmRecord},
    types::{Party, Race},
};

/// Column holding the voters of one (race, party) cell: `DEM` for the ALL row, `DEM_B` otherwise.
pub(crate) fn voter_column(race: Race, party: Party) -> String {
    match race {
        Race::All => party.code().to_string(),
        race => format!("{}_{}", party.code(), race.code()),
    }
}

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv::write] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv::write] Failed to write CSV to {:?}", path))
}

/// Write the block vote table: key, population per race, voters per (race, party), imputed flag.
pub fn write_block_votes(table: &BlockVoteTable, path: &Path) -> Result<()> {
    let rows = table.rows();

    let mut columns = vec![Column::new("GISJOIN".into(), rows.iter().map(|row| row.block.id()).collect::<Vec<_>>())];
    for race in Race::ALL {
        columns.push(Column::new(race.code().into(), rows.iter().map(|row| row.population.get(race)).collect::<Vec<_>>()));
    }
    for race in Race::ALL {
        for party in Party::ALL {
            columns.push(Column::new(
                voter_column(race, party).into(),
                rows.iter().map(|row| row.voters.get(race, party)).collect::<Vec<_>>(),
            ));
        }
    }
    columns.push(Column::new("imputed".into(), rows.iter().map(|row| row.imputed).collect::<Vec<_>>()));

    let mut df = DataFrame::new(columns)?;
    write_csv(&mut df, path)
}

/// Per-block metric columns, in output order. Metrics not computed are left empty.
pub(crate) fn metric_columns(rows: &[BlockMetrics]) -> Vec<(&'static str, Vec<Option<f64>>)> {
    let udm = |get: fn(&UdmRecord) -> f64| rows.iter().map(|row| row.udm.as_ref().map(get)).collect::<Vec<_>>();
    let dislocation = |get: fn(&Dislocation) -> f64|
        rows.iter().map(|row| row.opd.as_ref().map(|record| get(&record.dislocation))).collect::<Vec<_>>();
    let neighborhood = |get: fn(&GroupCounts) -> f64|
        rows.iter().map(|row| row.opd.as_ref().map(|record| get(&record.neighborhood))).collect::<Vec<_>>();
    let district = |get: fn(&GroupCounts) -> f64|
        rows.iter().map(|row| row.opd.as_ref().map(|record| get(&record.district))).collect::<Vec<_>>();

    vec![
        ("udm_dem", udm(|r| r.dem)),
        ("udm_rep", udm(|r| r.rep)),
        ("udm_non_white", udm(|r| r.non_white)),
        ("opd_party", dislocation(|d| d.party)),
        ("opd_race", dislocation(|d| d.race)),
        ("opd_opposed", dislocation(|d| d.opposed)),
        ("knn_total", neighborhood(|c| c.total)),
        ("knn_nw", neighborhood(|c| c.non_white())),
        ("knn_dem", neighborhood(|c| c.dem)),
        ("knn_rep", neighborhood(|c| c.rep)),
        ("knn_demb", neighborhood(|c| c.dem_black)),
        ("knn_repw", neighborhood(|c| c.rep_white)),
        ("sld_total", district(|c| c.total)),
        ("sld_nw", district(|c| c.non_white())),
        ("sld_dem", district(|c| c.dem)),
        ("sld_rep", district(|c| c.rep)),
        ("sld_demb", district(|c| c.dem_black)),
        ("sld_repw", district(|c| c.rep_white)),
    ]
}

/// Write per-block metrics without geometry.
pub fn write_block_metrics(rows: &[BlockMetrics], path: &Path) -> Result<()> {
    let mut columns = vec![Column::new("GISJOIN".into(), rows.iter().map(|row| row.block.id()).collect::<Vec<_>>())];
    for (name, values) in metric_columns(rows) {
        columns.push(Column::new(name.into(), values));
    }

    let mut df = DataFrame::new(columns)?;
    write_csv(&mut df, path)
}
