use std::fmt;
use std::time::Duration;

use crate::{Error, Result};

/// Widest time range a query may cover.
pub const MAX_SPAN: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A validated request for one station's readings between `start` and `end`
/// (both inclusive, in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub station: u32,
    pub start: i64,
    pub end: i64,
}

impl Query {
    /// An `end` before `start` is clamped to `start`. Ranges as wide as
    /// `max_span` or wider are rejected.
    pub fn new(station: u32, start: i64, end: i64, max_span: Duration) -> Result<Self> {
        let end = end.max(start);
        let query = Query {
            station,
            start,
            end,
        };
        let span = query.span();
        if span >= max_span {
            return Err(Error::RangeTooBig {
                span,
                max: max_span,
            });
        }
        Ok(query)
    }

    /// Parse `"station;start;end"`, validated like [`Query::new`].
    pub fn parse(s: &str, max_span: Duration) -> Result<Self> {
        let parts: Vec<&str> = s.split(';').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(Error::Query(format!(
                "expected station;start;end, got {:?}",
                s
            )));
        }
        let station = parts[0]
            .parse()
            .map_err(|_| Error::Query(format!("bad station id {:?}", parts[0])))?;
        let start = parse_timestamp(parts[1])?;
        let end = parse_timestamp(parts[2])?;
        Query::new(station, start, end, max_span)
    }

    pub fn span(&self) -> Duration {
        Duration::from_secs(self.end.abs_diff(self.start))
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        (self.start..=self.end).contains(&timestamp)
    }
}

fn parse_timestamp(s: &str) -> Result<i64> {
    s.parse()
        .map_err(|_| Error::Query(format!("bad timestamp {:?}", s)))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{};{};{}", self.station, self.start, self.end)
    }
}
