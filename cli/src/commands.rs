pub mod apportion;
pub mod metrics;

use std::path::Path;

use anyhow::Result;
use gerrymetrics::Config;

/// Configuration from `--config`, or the defaults.
pub(crate) fn load_config(cli: &crate::cli::Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_json_file(path),
        None => Ok(Config::default()),
    }
}

/// Whether an output path asks for GeoJSON (with geometry) rather than CSV.
pub(crate) fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
}
