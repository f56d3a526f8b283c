use std::collections::BTreeMap;
use std::path::Path;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{Error, Result};

/// Name under which a sample's timestamp is addressable by a policy.
pub const TIMESTAMP: &str = "timestamp";

// Sample is a single station reading. A field that is missing or null is
// absent, which is not the same as a reading of zero.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<f64>>,
}

impl Sample {
    pub fn new(timestamp: i64) -> Self {
        Sample {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), Some(value));
        self
    }

    pub fn with_null(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), None);
        self
    }

    /// Value of `field`, or `None` when it is missing or null.
    /// `timestamp` resolves to the sample's own timestamp.
    pub fn get(&self, field: &str) -> Option<f64> {
        if field == TIMESTAMP {
            return Some(self.timestamp as f64);
        }
        self.fields.get(field).copied().flatten()
    }
}

/// Sorts samples ascending by timestamp unless they already are, keeping the
/// relative order of equal timestamps. Returns true if a sort was needed.
pub fn sort_by_timestamp(samples: &mut [Sample]) -> bool {
    if samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        return false;
    }
    samples.sort_by_key(|s| s.timestamp);
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per line.
    Json,
    /// A header row followed by one row per sample; empty cells are null.
    Csv,
}

impl Format {
    /// Guess the format from the first bytes of an input.
    pub fn detect(buf: &[u8]) -> Option<Self> {
        let first = buf.iter().find(|b| !b.is_ascii_whitespace())?;
        if *first == b'{' {
            Some(Format::Json)
        } else {
            Some(Format::Csv)
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" | "jsonl" | "ndjson" => Some(Format::Json),
            "csv" => Some(Format::Csv),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum SampleReader<R: AsyncBufRead> {
    Json(Pin<Box<R>>),
    Csv {
        input: Pin<Box<R>>,
        header: Option<CsvHeader>,
    },
}

impl<R: AsyncBufRead> SampleReader<R> {
    pub fn new(format: Format, input: R) -> Self {
        Self::from_pinned(format, Box::pin(input))
    }

    /// Peek at the input to pick its format. Returns `None` for empty input.
    pub async fn detect(input: R) -> Result<Option<Self>> {
        let mut input = Box::pin(input);
        let Some(format) = Format::detect(input.fill_buf().await?) else {
            return Ok(None);
        };
        Ok(Some(Self::from_pinned(format, input)))
    }

    fn from_pinned(format: Format, input: Pin<Box<R>>) -> Self {
        match format {
            Format::Json => SampleReader::Json(input),
            Format::Csv => SampleReader::Csv {
                input,
                header: None,
            },
        }
    }

    pub fn format(&self) -> Format {
        match self {
            SampleReader::Json(_) => Format::Json,
            SampleReader::Csv { .. } => Format::Csv,
        }
    }

    /// Decode the next sample, or `None` at end of input.
    pub async fn decode(&mut self) -> Result<Option<Sample>> {
        match self {
            SampleReader::Json(input) => decode_json(input).await,
            SampleReader::Csv { input, header } => decode_csv(input, header).await,
        }
    }

    pub async fn read_all(&mut self) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        while let Some(sample) = self.decode().await? {
            samples.push(sample);
        }
        Ok(samples)
    }
}

/// Reads the next non-blank line into `line`. Returns false at end of input.
async fn next_line<R: AsyncBufReadExt + Unpin>(reader: &mut R, line: &mut String) -> Result<bool> {
    loop {
        line.clear();
        if reader.read_line(line).await? == 0 {
            return Ok(false);
        }
        if !line.trim().is_empty() {
            return Ok(true);
        }
    }
}

async fn decode_json<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<Option<Sample>> {
    let mut line = String::new();
    if !next_line(reader, &mut line).await? {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&line)?))
}

async fn decode_csv<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
    header: &mut Option<CsvHeader>,
) -> Result<Option<Sample>> {
    let mut line = String::new();
    while next_line(reader, &mut line).await? {
        let record = parse_csv_line(&line)?;
        match header {
            Some(h) => return h.sample(&record).map(Some),
            None => *header = Some(CsvHeader::new(&record)?),
        }
    }
    Ok(None)
}

fn parse_csv_line(line: &str) -> Result<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

/// Column layout taken from the first row of a CSV input.
#[derive(Debug, Clone)]
pub struct CsvHeader {
    width: usize,
    timestamp: usize,
    fields: Vec<(usize, String)>,
}

impl CsvHeader {
    fn new(record: &csv::StringRecord) -> Result<Self> {
        let timestamp = record
            .iter()
            .position(|name| name == TIMESTAMP)
            .ok_or_else(|| Error::MissingTimestamp(record.iter().collect::<Vec<_>>().join(",")))?;
        let fields = record
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != timestamp)
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        Ok(CsvHeader {
            width: record.len(),
            timestamp,
            fields,
        })
    }

    fn sample(&self, record: &csv::StringRecord) -> Result<Sample> {
        if record.len() != self.width {
            return Err(Error::RowWidth {
                got: record.len(),
                want: self.width,
            });
        }

        let raw = &record[self.timestamp];
        let timestamp = raw.parse::<i64>().map_err(|_| Error::BadValue {
            field: TIMESTAMP.to_string(),
            value: raw.to_string(),
        })?;

        let mut sample = Sample::new(timestamp);
        for (i, name) in &self.fields {
            let cell = &record[*i];
            let value = if cell.is_empty() || cell.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|_| Error::BadValue {
                    field: name.clone(),
                    value: cell.to_string(),
                })?)
            };
            sample.fields.insert(name.clone(), value);
        }
        Ok(sample)
    }
}
