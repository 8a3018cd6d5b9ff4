use std::{fs::File, io::BufReader, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::geom::SnapThresholds;

/// Run configuration, loadable from a JSON file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// EPSG code of geographic inputs (4269 = NAD83, 4326 = WGS84).
    pub source_epsg: u32,
    pub apportion: ApportionConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { source_epsg: 4269, apportion: ApportionConfig::default(), metrics: MetricsConfig::default() }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("[Config] failed to open {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[Config] failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.apportion.validate()?;
        self.metrics.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApportionConfig {
    pub snap: SnapThresholds,
    /// Estimate shares for precincts without a tally from their touching neighbors.
    pub impute: bool,
}

impl ApportionConfig {
    pub fn validate(&self) -> Result<()> {
        let SnapThresholds { low, high } = self.snap;
        ensure!(
            (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low < high,
            "[ApportionConfig] snap thresholds must satisfy 0 <= low < high <= 1 (got low = {low}, high = {high})"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub udm: bool,
    pub opd: bool,
    /// Search radius of the UDM neighborhood, in meters of the equal-area CRS.
    pub entropy_radius: Option<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { udm: false, opd: true, entropy_radius: None }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.udm || self.opd, "[MetricsConfig] at least one of udm and opd must be enabled");
        if self.udm {
            self.radius()?;
        }
        Ok(())
    }

    /// The UDM radius; fails unless it is finite and positive.
    pub fn radius(&self) -> Result<f64> {
        let radius = self.entropy_radius.context("[MetricsConfig] udm requires an entropy_radius")?;
        ensure!(radius.is_finite() && radius > 0.0, "[MetricsConfig] entropy_radius must be a positive distance (got {radius})");
        Ok(radius)
    }
}
