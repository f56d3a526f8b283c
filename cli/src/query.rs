use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use duration_string::DurationString;
use eyre::Result;
use livewind::{DirSource, Downsampled, Downsampler, Query, SampleSource, Table};
use tracing::{debug, info};

use crate::config::Config;
use crate::downsample::Shape;
use crate::report;

#[derive(Args, Debug)]
pub struct Opts {
    /// Station identifier
    #[clap(long, required_unless_present = "window")]
    pub station: Option<u32>,

    /// Range start, unix seconds
    #[clap(long, required_unless_present = "window")]
    pub start: Option<i64>,

    /// Range end, unix seconds, inclusive
    #[clap(long, required_unless_present = "window")]
    pub end: Option<i64>,

    /// Station and range in one value, "station;start;end"
    #[clap(long, conflicts_with_all = ["station", "start", "end"])]
    pub window: Option<String>,

    /// Directory of <station>.jsonl / <station>.csv files [default: from config]
    #[clap(long, env = "LIVEWIND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Widest range accepted, e.g. "7d" [default: from config]
    #[clap(long)]
    pub max_span: Option<DurationString>,

    #[clap(flatten)]
    pub shape: Shape,

    #[clap(flatten)]
    pub report: report::Encoding,
}

impl Opts {
    /// The validated query, from `--window` or the separate range flags.
    pub fn query(&self, config: &Config) -> Result<Query> {
        let max_span = self.max_span.clone().map(Duration::from).unwrap_or(config.max_span);
        if let Some(window) = &self.window {
            return Ok(Query::parse(window, max_span)?);
        }
        match (self.station, self.start, self.end) {
            (Some(station), Some(start), Some(end)) => Ok(Query::new(station, start, end, max_span)?),
            _ => eyre::bail!("--station, --start and --end are required without --window"),
        }
    }
}

pub async fn query(opts: &Opts, config: &Config) -> Result<()> {
    let query = opts.query(config)?;

    let source = DirSource::new(opts.data_dir.as_ref().unwrap_or(&config.data_dir));
    debug!(root = %source.root().display(), %query, "querying station data");
    let out = run(&source, &query, &opts.shape.downsampler(config)).await?;

    report::write_table(&opts.report, &Table::from(&out)).await
}

/// Fetch the readings behind `query` and downsample them.
pub async fn run(
    source: &dyn SampleSource,
    query: &Query,
    downsampler: &Downsampler,
) -> Result<Downsampled> {
    let samples = source.fetch(query).await?;
    let fetched = samples.len();
    let out = downsampler.run(samples);
    info!(%query, samples = fetched, rows = out.len(), "query");
    Ok(out)
}
