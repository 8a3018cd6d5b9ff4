//! CSV reading operations.

use std::{collections::HashMap, fs::File, path::Path};

use anyhow::{bail, Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, StringChunked}};

use super::write::voter_column;
use crate::{
    apportion::{BlockVoteTable, BlockVotes},
    types::{GeoId, GeoType, Party, Population, Race, VoterTally},
};

/// Read a CSV file with every column as a string, so ids keep their leading zeros.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    df.column(name)
        .with_context(|| format!("[io::csv::read] Missing required column: {name}"))?
        .str()
        .with_context(|| format!("[io::csv::read] Column {name} is not text"))
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>, name: &str, row: usize) -> Result<T> {
    let text = value.unwrap_or("").trim();
    match text.parse() {
        Ok(n) => Ok(n),
        Err(_) => bail!("[io::csv::read] Invalid {name} value {text:?} on row {}", row + 1),
    }
}

/// Read grouped registration rows
/// (`county_desc, precinct_abbrv, race_code, ethnic_code, party_cd, Voters`)
/// into one tally per precinct key. Repeated groups are summed.
pub fn read_precinct_tallies(path: &Path) -> Result<HashMap<GeoId, VoterTally>> {
    let df = read_csv(path)?;
    let regions = column(&df, "county_desc")?;
    let precincts = column(&df, "precinct_abbrv")?;
    let races = column(&df, "race_code")?;
    let ethnicities = column(&df, "ethnic_code")?;
    let parties = column(&df, "party_cd")?;
    let voters = column(&df, "Voters")?;

    let mut tallies = HashMap::<GeoId, VoterTally>::new();
    let mut undesignated = 0u64;
    for row in 0..df.height() {
        let (Some(region), Some(precinct)) = (regions.get(row), precincts.get(row)) else {
            tracing::warn!(row = row + 1, "registration row has no precinct; skipped");
            continue
        };
        let count = parse_number::<u64>(voters.get(row), "Voters", row)?;
        let party = Party::from_code(parties.get(row).unwrap_or(""));

        let tally = tallies.entry(GeoId::precinct(region, precinct)).or_default();
        if !tally.record(races.get(row).unwrap_or(""), ethnicities.get(row).unwrap_or(""), party, count) {
            undesignated += count;
        }
    }

    if undesignated > 0 {
        tracing::warn!(voters = undesignated, "voters with an undesignated race count only toward ALL");
    }
    tracing::info!(precincts = tallies.len(), "read registration tallies from {}", path.display());
    Ok(tallies)
}

/// Census race × ethnicity components, in `Population::from_components` order.
const COMPONENTS: [&str; 6] = ["NL_W", "NL_B", "NL_O", "HL_W", "HL_B", "HL_O"];

/// Read census block populations (`GISJOIN, NL_W, NL_B, NL_O, HL_W, HL_B, HL_O`).
pub fn read_block_population(path: &Path) -> Result<HashMap<GeoId, Population>> {
    let df = read_csv(path)?;
    let keys = column(&df, "GISJOIN")?;
    let components = COMPONENTS.iter()
        .map(|name| column(&df, name))
        .collect::<Result<Vec<_>>>()?;

    let mut populations = HashMap::with_capacity(df.height());
    for row in 0..df.height() {
        let Some(key) = keys.get(row) else { bail!("[io::csv::read] Missing GISJOIN on row {}", row + 1) };

        let mut counts = [0.0; 6];
        for (count, (name, values)) in counts.iter_mut().zip(COMPONENTS.iter().zip(&components)) {
            *count = parse_number(values.get(row), name, row)?;
        }
        let [nl_w, nl_b, nl_o, hl_w, hl_b, hl_o] = counts;

        let population = Population::from_components(nl_w, nl_b, nl_o, hl_w, hl_b, hl_o);
        if populations.insert(GeoId::new(GeoType::Block, key), population).is_some() {
            bail!("[io::csv::read] Duplicate block {key} in {}", path.display());
        }
    }
    Ok(populations)
}

/// Read a table written by `write_block_votes`.
pub fn read_block_votes(path: &Path) -> Result<BlockVoteTable> {
    let df = read_csv(path)?;
    let keys = column(&df, "GISJOIN")?;
    let imputed = column(&df, "imputed")?;

    let population_columns = Race::ALL
        .map(|race| column(&df, race.code()).map(|values| (race, values)))
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    let voter_columns = Race::ALL.into_iter()
        .flat_map(|race| Party::ALL.map(|party| (race, party)))
        .map(|(race, party)| column(&df, &voter_column(race, party)).map(|values| (race, party, values)))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = std::collections::HashSet::new();
    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let Some(key) = keys.get(row) else { bail!("[io::csv::read] Missing GISJOIN on row {}", row + 1) };
        let block = GeoId::new(GeoType::Block, key);
        if !seen.insert(block.clone()) {
            bail!("[io::csv::read] Duplicate block {key} in {}", path.display());
        }

        let mut population = Population::default();
        for (race, values) in &population_columns {
            population.set(*race, parse_number(values.get(row), race.code(), row)?);
        }
        let mut voters = VoterTally::default();
        for (race, party, values) in &voter_columns {
            voters.set(*race, *party, parse_number(values.get(row), "voter count", row)?);
        }
        let imputed = matches!(imputed.get(row).map(str::trim), Some("true" | "True" | "1"));

        rows.push(BlockVotes { block, population, voters, imputed });
    }
    Ok(BlockVoteTable::new(rows))
}
