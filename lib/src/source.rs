use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, warn};

use crate::{sort_by_timestamp, Error, Format, Query, Result, Sample, SampleReader};

/// Where the readings behind a [`Query`] come from. Implementations return
/// samples inside the query's range, sorted ascending by timestamp.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Vec<Sample>>;

    /// Station ids this source holds readings for, ascending.
    async fn stations(&self) -> Result<Vec<u32>>;

    /// The most recent reading of `station`, `None` if it has no readings.
    async fn latest(&self, station: u32) -> Result<Option<Sample>>;

    /// The most recent reading of every station that has one.
    async fn latest_all(&self) -> Result<Vec<(u32, Sample)>> {
        let mut readings = Vec::new();
        for station in self.stations().await? {
            if let Some(sample) = self.latest(station).await? {
                readings.push((station, sample));
            }
        }
        Ok(readings)
    }
}

/// Readings stored as one file per station under a directory:
/// `<root>/<station>.jsonl` (or `.json`, `.ndjson`) or `<root>/<station>.csv`.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

const EXTENSIONS: &[&str] = &["jsonl", "ndjson", "json", "csv"];

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn locate(&self, station: u32) -> Result<(PathBuf, Format)> {
        for ext in EXTENSIONS {
            let path = self.root.join(format!("{}.{}", station, ext));
            if tokio::fs::metadata(&path).await.is_ok() {
                if let Some(format) = Format::from_path(&path) {
                    return Ok((path, format));
                }
            }
        }
        Err(Error::UnknownStation(station))
    }

    async fn open(&self, station: u32) -> Result<(PathBuf, SampleReader<BufReader<File>>)> {
        let (path, format) = self.locate(station).await?;
        let file = File::open(&path).await?;
        Ok((path, SampleReader::new(format, BufReader::new(file))))
    }
}

#[async_trait]
impl SampleSource for DirSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<Sample>> {
        let (path, mut reader) = self.open(query.station).await?;
        debug!(path = %path.display(), format = ?reader.format(), %query, "reading station data");

        let mut samples = Vec::new();
        while let Some(sample) = reader.decode().await? {
            if query.contains(sample.timestamp) {
                samples.push(sample);
            }
        }

        if sort_by_timestamp(&mut samples) {
            warn!(path = %path.display(), "station data out of order, sorted");
        }
        Ok(samples)
    }

    async fn stations(&self) -> Result<Vec<u32>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut stations = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if Format::from_path(&path).is_none() {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u32>().ok());
            if let Some(id) = id {
                stations.push(id);
            }
        }
        stations.sort_unstable();
        stations.dedup();
        Ok(stations)
    }

    async fn latest(&self, station: u32) -> Result<Option<Sample>> {
        let (path, mut reader) = self.open(station).await?;
        debug!(path = %path.display(), station, "reading latest sample");

        // Files are usually in order, but the newest reading wins either way.
        let mut latest: Option<Sample> = None;
        while let Some(sample) = reader.decode().await? {
            if latest.as_ref().map_or(true, |l| sample.timestamp >= l.timestamp) {
                latest = Some(sample);
            }
        }
        Ok(latest)
    }
}

/// Readings held in memory, keyed by station.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    stations: HashMap<u32, Vec<Sample>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, station: u32, mut samples: Vec<Sample>) {
        sort_by_timestamp(&mut samples);
        self.stations.insert(station, samples);
    }
}

#[async_trait]
impl SampleSource for StaticSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<Sample>> {
        let samples = self
            .stations
            .get(&query.station)
            .ok_or(Error::UnknownStation(query.station))?;
        let from = samples.partition_point(|s| s.timestamp < query.start);
        let to = samples.partition_point(|s| s.timestamp <= query.end);
        Ok(samples[from..to].to_vec())
    }

    async fn stations(&self) -> Result<Vec<u32>> {
        let mut stations: Vec<u32> = self.stations.keys().copied().collect();
        stations.sort_unstable();
        Ok(stations)
    }

    async fn latest(&self, station: u32) -> Result<Option<Sample>> {
        let samples = self
            .stations
            .get(&station)
            .ok_or(Error::UnknownStation(station))?;
        Ok(samples.last().cloned())
    }
}
