//! CSV bar loading.
//!
//! Expects a header row with `time,open,high,low,close,volume` (extra columns
//! are ignored). `time` may be RFC 3339, `YYYY-MM-DD HH:MM:SS` taken as UTC,
//! or integer epoch milliseconds. Rows are sorted by time; integrity checks
//! (finite prices, high >= low, strictly increasing timestamps) are left to
//! the replay engine, which stops the run at the first bad bar.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use kaizen_core::Bar;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized time '{value}'")]
    Time { row: usize, value: String },
    #[error("no bars found")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let bars = read_bars(file)?;
    info!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvBar>().enumerate() {
        let raw = record?;
        let timestamp = parse_time(&raw.time).ok_or_else(|| LoadError::Time {
            row: row + 1,
            value: raw.time.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        });
    }
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Parse one of the accepted time encodings.
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

/// BLAKE3 over every bar field, for tagging results with their input.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
