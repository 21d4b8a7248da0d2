use crate::domain::errors::DataError;
use crate::domain::market::candle::Candle;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Raw CSV row as exported by the data vendor. Prices arrive as strings and
/// are converted to `Decimal` explicitly so a bad cell fails loudly instead of
/// silently rounding through a float.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    /// Missing for daily exports; M1 files always carry it.
    #[serde(rename = "Time", default)]
    time: Option<String>,
    #[serde(rename = "Open")]
    open: String,
    #[serde(rename = "High")]
    high: String,
    #[serde(rename = "Low")]
    low: String,
    #[serde(rename = "Close")]
    close: String,
    #[serde(rename = "Volume")]
    volume: String,
}

/// Loads M1 candle history from `Date,Time,Open,High,Low,Close,Volume` CSV
/// files (`%m/%d/%Y` dates, `HH:MM` times). Rows with inconsistent OHLC are
/// skipped with a warning; duplicate timestamps keep the first occurrence.
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Candle>, DataError> {
        let reader = csv::Reader::from_path(&self.path)?;
        let name = self.path.display().to_string();
        let candles = read_candles(reader, &name)?;
        info!(file = %name, candles = candles.len(), "loaded M1 history");
        Ok(candles)
    }
}

/// Parses candles out of any CSV reader; split out so tests can feed strings.
pub fn read_candles<R: Read>(
    mut reader: csv::Reader<R>,
    source_name: &str,
) -> Result<Vec<Candle>, DataError> {
    let mut candles = Vec::new();
    let mut skipped = 0usize;

    for (idx, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let candle = parse_row(idx + 1, &row)?;
        if !candle.is_well_formed() {
            warn!(row = idx + 1, time = candle.time, "inconsistent OHLC row skipped");
            skipped += 1;
            continue;
        }
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.time);
    let before = candles.len();
    candles.dedup_by_key(|c| c.time);
    let duplicates = before - candles.len();
    if duplicates > 0 || skipped > 0 {
        warn!(source = %source_name, duplicates, skipped, "dropped rows during load");
    }

    if candles.is_empty() {
        return Err(DataError::Empty {
            source_name: source_name.to_string(),
        });
    }
    Ok(candles)
}

fn parse_row(row_number: usize, row: &CsvRow) -> Result<Candle, DataError> {
    let malformed = |reason: String| DataError::MalformedRow {
        row: row_number,
        reason,
    };

    let date = NaiveDate::parse_from_str(row.date.trim(), "%m/%d/%Y")
        .map_err(|e| malformed(format!("invalid date '{}': {}", row.date, e)))?;
    let time = match row.time.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .map_err(|e| malformed(format!("invalid time '{}': {}", t, e)))?,
        _ => NaiveTime::MIN,
    };
    let timestamp = date.and_time(time).and_utc().timestamp();

    let price = |field: &str, value: &str| {
        Decimal::from_str(value.trim())
            .map_err(|e| malformed(format!("invalid {} '{}': {}", field, value, e)))
    };

    Ok(Candle {
        time: timestamp,
        open: price("open", &row.open)?,
        high: price("high", &row.high)?,
        low: price("low", &row.low)?,
        close: price("close", &row.close)?,
        volume: price("volume", &row.volume)?,
    })
}
