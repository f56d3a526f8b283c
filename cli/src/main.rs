mod config;
mod downsample;
mod io;
mod last;
mod query;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "livewind",
    about = "Downsample weather station readings into chart-sized series"
)]
struct Cli {
    /// TOML config file
    #[arg(long, short = 'c', global = true, env = "LIVEWIND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Downsample one station's readings over a time range
    Query(query::Opts),
    /// Downsample readings from files or stdin
    Downsample(downsample::Opts),
    /// Latest reading of one station or of all stations
    Last(last::Opts),
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref()).await?;
    match cli.command {
        Command::Query(opts) => query::query(&opts, &config).await,
        Command::Downsample(opts) => downsample::downsample(&opts, &config).await,
        Command::Last(opts) => last::last(&opts, &config).await,
    }
}
