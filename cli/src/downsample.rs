use std::num::NonZeroUsize;

use clap::Args;
use eyre::{Result, WrapErr};
use livewind::{sort_by_timestamp, Downsampler, FieldPolicy, Sample, SampleReader, Table};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::io::open_input;
use crate::report;

/// Point count and policy, falling back to the config file.
#[derive(Args, Debug)]
pub struct Shape {
    /// Number of points to reduce to [default: from config, else 288]
    #[clap(long, env = "LIVEWIND_POINTS")]
    pub points: Option<NonZeroUsize>,

    /// Reduction per field, e.g. "wind=mean,gust=max,direction=circular:360"
    #[clap(long)]
    pub policy: Option<FieldPolicy>,
}

impl Shape {
    pub fn downsampler(&self, config: &Config) -> Downsampler {
        Downsampler::new(
            self.points.unwrap_or(config.points),
            self.policy.clone().unwrap_or_else(|| config.policy.clone()),
        )
    }
}

#[derive(Args, Debug)]
pub struct Opts {
    #[clap(flatten)]
    pub shape: Shape,

    #[clap(flatten)]
    pub report: report::Encoding,

    /// Input files, JSON lines or CSV [default: stdin]
    pub files: Vec<String>,
}

pub async fn downsample(opts: &Opts, config: &Config) -> Result<()> {
    let sources: Vec<String> = if opts.files.is_empty() {
        vec!["stdin".to_string()]
    } else {
        opts.files.clone()
    };

    let batches = futures::future::try_join_all(sources.iter().map(|s| read_samples(s))).await?;
    let mut samples: Vec<Sample> = batches.into_iter().flatten().collect();
    if sort_by_timestamp(&mut samples) {
        warn!("input not in timestamp order, sorted");
    }

    let downsampler = opts.shape.downsampler(config);
    let read = samples.len();
    let out = downsampler.run(samples);
    info!(samples = read, rows = out.len(), aggregated = out.is_aggregated(), "downsampled");

    report::write_table(&opts.report, &Table::from(&out)).await
}

async fn read_samples(name: &str) -> Result<Vec<Sample>> {
    let input = open_input(name).await?;
    let Some(mut reader) = SampleReader::detect(input).await? else {
        debug!(source = name, "empty input");
        return Ok(Vec::new());
    };
    let samples = reader
        .read_all()
        .await
        .wrap_err_with(|| format!("decode {}", name))?;
    debug!(source = name, format = ?reader.format(), samples = samples.len(), "read samples");
    Ok(samples)
}
