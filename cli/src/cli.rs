use std::path::PathBuf;

/// Precinct-to-block apportionment and district dislocation metrics
#[derive(clap::Parser, Debug)]
#[command(name = "gerrymetrics", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Apportion precinct registration tallies onto census blocks
    Apportion(ApportionArgs),

    /// Compute UDM and OPD for apportioned blocks
    Metrics(MetricsArgs),
}

#[derive(clap::Args, Debug)]
pub struct ApportionArgs {
    /// Precinct shapefile
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub precincts: PathBuf,

    /// Grouped registration CSV (county_desc, precinct_abbrv, race_code, ethnic_code, party_cd, Voters)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub voters: PathBuf,

    /// Census block shapefile keyed by GISJOIN
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub blocks: PathBuf,

    /// Block population CSV (GISJOIN, NL_W, NL_B, NL_O, HL_W, HL_B, HL_O)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub population: PathBuf,

    /// Output block vote table; a .geojson extension writes geometry, anything else writes CSV.
    /// Defaults to "./block_votes.csv"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Impute shares for precincts without a tally from their touching neighbors
    #[arg(long)]
    pub impute: bool,
}

#[derive(clap::Args, Debug)]
pub struct MetricsArgs {
    /// Census block shapefile keyed by GISJOIN
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub blocks: PathBuf,

    /// Block vote table written by `apportion` (CSV)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub votes: PathBuf,

    /// District shapefile
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub districts: PathBuf,

    /// Compute uncertainty of district membership
    #[arg(long)]
    pub udm: bool,

    /// Compute opposed partisan dislocation
    #[arg(long)]
    pub opd: bool,

    /// UDM search radius in meters
    #[arg(short = 'r', long)]
    pub entropy_radius: Option<f64>,

    /// Output file; a .geojson extension writes geometry, anything else writes CSV.
    /// Defaults to "./block_metrics.geojson"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}
