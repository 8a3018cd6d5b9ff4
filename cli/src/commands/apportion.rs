use anyhow::Result;
use gerrymetrics::io::{csv, geojson, shp};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::ApportionArgs) -> Result<()> {
    let mut config = super::load_config(cli)?;
    config.apportion.impute |= args.impute;
    config.apportion.validate()?;

    let out_path = args.output.clone().unwrap_or("./block_votes.csv".into());

    tracing::info!("[apportion] loading precincts from {}", args.precincts.display());
    let tallies = csv::read_precinct_tallies(&args.voters)?;
    let precincts = shp::read_precincts(&args.precincts, config.source_epsg)?
        .to_equal_area()?
        .join_tallies(tallies)?;

    tracing::info!("[apportion] loading blocks from {}", args.blocks.display());
    let populations = csv::read_block_population(&args.population)?;
    let blocks = shp::read_blocks(&args.blocks, populations, config.source_epsg)?.to_equal_area()?;

    let result = gerrymetrics::apportion(&blocks, &precincts, &config.apportion)?;
    let missing = result.missing().count();
    if missing > 0 {
        tracing::warn!(precincts = missing, "[apportion] blocks of untallied precincts were left out");
    }

    tracing::info!("[apportion] writing {} blocks to {}", result.table.len(), out_path.display());
    if super::is_geojson(&out_path) {
        geojson::write_block_votes(&blocks, &result.table, &out_path)
    } else {
        csv::write_block_votes(&result.table, &out_path)
    }
}
