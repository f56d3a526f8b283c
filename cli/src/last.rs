use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use eyre::Result;
use livewind::{DirSource, Sample, SampleSource, Table};
use tracing::info;

use crate::config::Config;
use crate::report;

/// Which stations to report on: one id, or every station with data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stations {
    All,
    One(u32),
}

impl FromStr for Stations {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim() {
            "all" => Ok(Stations::All),
            id => id
                .parse()
                .map(Stations::One)
                .map_err(|_| format!("expected a station id or \"all\", got {:?}", s)),
        }
    }
}

impl fmt::Display for Stations {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stations::All => write!(f, "all"),
            Stations::One(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Args, Debug)]
pub struct Opts {
    /// Station identifier, or "all"
    #[clap(long)]
    pub station: Stations,

    /// Directory of <station>.jsonl / <station>.csv files [default: from config]
    #[clap(long, env = "LIVEWIND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[clap(flatten)]
    pub report: report::Encoding,
}

pub async fn last(opts: &Opts, config: &Config) -> Result<()> {
    let source = DirSource::new(opts.data_dir.as_ref().unwrap_or(&config.data_dir));
    let table = run(&source, opts.station).await?;
    report::write_table(&opts.report, &table).await
}

/// The latest reading of one station, or of every station keyed by id.
pub async fn run(source: &dyn SampleSource, stations: Stations) -> Result<Table> {
    let table = match stations {
        Stations::All => Table::from_stations(&source.latest_all().await?),
        Stations::One(id) => {
            let latest: Vec<Sample> = source.latest(id).await?.into_iter().collect();
            Table::from_samples(&latest)
        }
    };
    info!(%stations, rows = table.rows.len(), "last");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use livewind::StaticSource;

    fn stations() -> StaticSource {
        let mut source = StaticSource::new();
        source.insert(
            1,
            vec![
                Sample::new(100).with("wind", 2.0).with("gust", 4.0),
                Sample::new(160).with("wind", 3.0).with_null("gust"),
            ],
        );
        source.insert(2, vec![Sample::new(150).with("wind", 7.5)]);
        source.insert(3, Vec::new());
        source
    }

    #[test]
    fn parse_stations() {
        assert_eq!("all".parse::<Stations>(), Ok(Stations::All));
        assert_eq!(" 17 ".parse::<Stations>(), Ok(Stations::One(17)));
        assert!("some".parse::<Stations>().is_err());
        assert!("-2".parse::<Stations>().is_err());
        assert_eq!(Stations::One(4).to_string(), "4");
    }

    #[tokio::test]
    async fn last_of_one_station() {
        let table = run(&stations(), Stations::One(1)).await.unwrap();
        assert_eq!(table.columns, vec!["timestamp", "gust", "wind"]);
        assert_eq!(table.rows, vec![vec![Some(160.0), None, Some(3.0)]]);

        let empty = run(&stations(), Stations::One(3)).await.unwrap();
        assert!(empty.is_empty());

        assert!(run(&stations(), Stations::One(9)).await.is_err());
    }

    #[tokio::test]
    async fn last_of_all_stations() {
        let table = run(&stations(), Stations::All).await.unwrap();
        assert_eq!(table.columns, vec!["station", "timestamp", "gust", "wind"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Some(1.0), Some(160.0), None, Some(3.0)],
                vec![Some(2.0), Some(150.0), None, Some(7.5)],
            ]
        );
    }
}
