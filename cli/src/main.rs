mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{apportion, metrics};
use tracing_subscriber::EnvFilter;

/// Install the log subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match &cli.command {
        Commands::Apportion(args) => apportion::run(&cli, args),
        Commands::Metrics(args) => metrics::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
