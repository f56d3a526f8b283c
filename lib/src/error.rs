use std::time::Duration;

/// Errors raised around the downsampling core: decoding samples, parsing
/// policies, validating queries and locating station data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("bad json sample: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad csv sample: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv header has no timestamp column: {0:?}")]
    MissingTimestamp(String),

    #[error("bad value {value:?} for {field:?}")]
    BadValue { field: String, value: String },

    #[error("csv row has {got} cells, header has {want}")]
    RowWidth { got: usize, want: usize },

    #[error("bad policy: {0}")]
    Policy(String),

    #[error("bad query: {0}")]
    Query(String),

    #[error("time range too big: {span:?} (max {max:?})")]
    RangeTooBig { span: Duration, max: Duration },

    #[error("no data for station {0}")]
    UnknownStation(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
