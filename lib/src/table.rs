use std::collections::BTreeSet;
use std::io::Write;

use serde_json::{Number, Value};
use tabwriter::TabWriter;

use crate::{AggregatedRow, Downsampled, Result, Sample, TIMESTAMP};

/// Column naming the station in multi-station tables.
pub const STATION: &str = "station";

/// Rows sharing one fixed set of columns, each cell numeric or null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    /// Raw samples get `timestamp` first, then every field seen in any sample.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let fields: BTreeSet<&str> = samples
            .iter()
            .flat_map(|s| s.fields.keys().map(String::as_str))
            .collect();
        let mut columns = vec![TIMESTAMP.to_string()];
        columns.extend(fields.into_iter().map(str::to_string));

        let rows = samples
            .iter()
            .map(|s| columns.iter().map(|c| s.get(c)).collect())
            .collect();
        Table { columns, rows }
    }

    /// One latest reading per station: `station` first, then the columns
    /// of [`Table::from_samples`].
    pub fn from_stations(readings: &[(u32, Sample)]) -> Self {
        let samples: Vec<Sample> = readings.iter().map(|(_, s)| s.clone()).collect();
        let mut table = Table::from_samples(&samples);
        table.columns.insert(0, STATION.to_string());
        for (row, (station, _)) in table.rows.iter_mut().zip(readings) {
            row.insert(0, Some(f64::from(*station)));
        }
        table
    }

    /// Aggregated rows share their policy's columns.
    pub fn from_rows(rows: &[AggregatedRow]) -> Self {
        let columns = match rows.first() {
            Some(row) => row.iter().map(|(name, _)| name.to_string()).collect(),
            None => Vec::new(),
        };
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|(_, v)| v).collect())
            .collect();
        Table { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<&Downsampled> for Table {
    fn from(d: &Downsampled) -> Self {
        match d {
            Downsampled::Raw(samples) => Table::from_samples(samples),
            Downsampled::Aggregated(rows) => Table::from_rows(rows),
        }
    }
}

/// Round half up to two decimals.
fn round(v: f64) -> f64 {
    (v * 100.0 + 0.5).floor() / 100.0
}

fn json_value(v: Option<f64>) -> Value {
    let Some(v) = v.map(round) else {
        return Value::Null;
    };
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        return Value::from(v as i64);
    }
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn text_value(v: Option<f64>) -> String {
    match v {
        Some(v) => round(v).to_string(),
        None => "null".to_string(),
    }
}

/// Writes the table as a JSON array whose first element holds the column
/// names and whose following elements hold one row of values each. An empty
/// table is written as `[]`.
pub fn report_json(t: &Table, w: &mut dyn Write) -> Result<()> {
    let mut out = Vec::with_capacity(t.rows.len() + 1);
    if !t.is_empty() {
        out.push(Value::from(t.columns.clone()));
        for row in &t.rows {
            out.push(Value::Array(row.iter().map(|v| json_value(*v)).collect()));
        }
    }
    serde_json::to_writer(&mut *w, &out)?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Writes a header row and one record per row. Nulls are empty cells.
pub fn report_csv(t: &Table, w: &mut dyn Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    if !t.is_empty() {
        wtr.write_record(&t.columns)?;
        for row in &t.rows {
            wtr.write_record(row.iter().map(|v| match v {
                Some(v) => round(*v).to_string(),
                None => String::new(),
            }))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn report_text(t: &Table, w: &mut dyn Write) -> Result<()> {
    let mut tw = TabWriter::new(w);
    writeln!(tw, "{}", t.columns.join("\t"))?;
    for row in &t.rows {
        let cells: Vec<String> = row.iter().map(|v| text_value(*v)).collect();
        writeln!(tw, "{}", cells.join("\t"))?;
    }
    tw.flush()?;
    Ok(())
}
