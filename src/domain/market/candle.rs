use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle. `time` is the Unix timestamp (seconds, UTC) of the
/// start of the bucket the candle covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Builds a flat synthetic candle used to backfill missing buckets.
    pub fn flat(time: i64, price: Decimal) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
        }
    }

    /// Folds another candle into this one.
    ///
    /// Open stays the first candle's open; high/low widen, close tracks the
    /// latest close and volume accumulates.
    pub fn merge(&mut self, other: &Candle) {
        if other.high > self.high {
            self.high = other.high;
        }
        if other.low < self.low {
            self.low = other.low;
        }
        self.close = other.close;
        self.volume += other.volume;
    }

    /// OHLC consistency check used by the ingestion layer. The aggregator
    /// itself never rejects candles; producers validate before feeding it.
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.high >= self.low
            && self.volume >= Decimal::ZERO
    }
}

/// Kind of incremental series change a timeframe produced for one M1 input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// A new bar began; the renderer appends it to the series.
    New,
    /// The open bar changed in place; the renderer replaces the last bar.
    Update,
}

/// Per-timeframe update descriptor returned by `CandleAggregator::add_m1_candle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleUpdate {
    pub kind: UpdateKind,
    pub candle: Candle,
}

/// Wire representation of a candle for the chart feed: plain floats, the field
/// names and units the rendering layer expects.
#[derive(Debug, Clone, Serialize)]
pub struct ChartBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&Candle> for ChartBar {
    fn from(candle: &Candle) -> Self {
        Self {
            time: candle.time,
            open: candle.open.to_f64().unwrap_or(0.0),
            high: candle.high.to_f64().unwrap_or(0.0),
            low: candle.low.to_f64().unwrap_or(0.0),
            close: candle.close.to_f64().unwrap_or(0.0),
            volume: candle.volume.to_f64().unwrap_or(0.0),
        }
    }
}
