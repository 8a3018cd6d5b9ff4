use anyhow::Result;
use gerrymetrics::io::{csv, geojson, shp};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::MetricsArgs) -> Result<()> {
    let mut config = super::load_config(cli)?;
    if args.udm || args.opd {
        config.metrics.udm = args.udm;
        config.metrics.opd = args.opd;
    }
    if let Some(radius) = args.entropy_radius {
        config.metrics.entropy_radius = Some(radius);
    }
    config.metrics.validate()?;

    let out_path = args.output.clone().unwrap_or("./block_metrics.geojson".into());

    tracing::info!("[metrics] loading blocks from {}", args.blocks.display());
    let table = csv::read_block_votes(&args.votes)?;
    let blocks = shp::read_block_shapes(&args.blocks, config.source_epsg)?.to_equal_area()?;

    tracing::info!("[metrics] loading districts from {}", args.districts.display());
    let districts = shp::read_districts(&args.districts, config.source_epsg)?.to_equal_area()?;

    let output = gerrymetrics::compute_metrics(&blocks, &table, &districts, &config.metrics)?;
    let rows = output.blocks();

    tracing::info!("[metrics] writing {} blocks to {}", rows.len(), out_path.display());
    if super::is_geojson(&out_path) {
        geojson::write_block_metrics(&blocks, &rows, &out_path)
    } else {
        csv::write_block_metrics(&rows, &out_path)
    }
}
