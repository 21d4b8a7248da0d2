use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::warn;

/// Detection looks at a sliding three-candle window; series longer than this
/// are truncated to the most recent candles first.
const MAX_SCAN_CANDLES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FvgKind {
    Bullish,
    Bearish,
}

/// How and when a gap stopped being valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FvgClearing {
    pub cleared_at: i64,
    pub cleared_by_price: Decimal,
}

/// A fair value gap: the price void left between the left candle's extreme and
/// the right candle's extreme when the center candle moves impulsively.
/// Field names follow the chart overlay's expectations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueGap {
    #[serde(rename = "type")]
    pub kind: FvgKind,
    /// Left candle's bucket start; the zone is drawn from here.
    pub start_time: i64,
    /// Where the drawn zone ends: `start_time` plus the clearing window.
    pub end_time: i64,
    /// Bucket start of the right candle, where the gap was confirmed.
    pub formation_time: i64,
    pub top_price: Decimal,
    pub bottom_price: Decimal,
    pub gap_size: Decimal,
    pub gap_percentage: Decimal,
    /// Close beyond this level invalidates the gap.
    pub clearing_trigger_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<FvgClearing>,
    // Scan cursor for the clearing pass; not part of the overlay contract.
    #[serde(skip)]
    formation_idx: usize,
}

impl FairValueGap {
    pub fn is_cleared(&self) -> bool {
        self.cleared.is_some()
    }
}

/// Scans candle series for fair value gaps and tracks their clearing status.
#[derive(Debug, Clone, Copy)]
pub struct FvgDetector {
    /// Number of candles a gap stays live after formation.
    clearing_window: usize,
}

impl Default for FvgDetector {
    fn default() -> Self {
        Self::new(40)
    }
}

impl FvgDetector {
    pub fn new(clearing_window: usize) -> Self {
        Self { clearing_window }
    }

    /// Detects every fair value gap in `candles` (assumed chronological) and
    /// marks the ones cleared by a later close through the trigger level.
    pub fn detect(&self, candles: &[Candle], timeframe: Timeframe) -> Vec<FairValueGap> {
        if candles.len() < 3 {
            return Vec::new();
        }

        let candles = if candles.len() > MAX_SCAN_CANDLES {
            warn!(
                total = candles.len(),
                limit = MAX_SCAN_CANDLES,
                "FVG scan input truncated to most recent candles"
            );
            &candles[candles.len() - MAX_SCAN_CANDLES..]
        } else {
            candles
        };

        let mut gaps = Vec::new();
        for i in 2..candles.len() {
            let left = &candles[i - 2];
            let center = &candles[i - 1];
            let right = &candles[i];

            // Bullish: impulsive up-close leaves a void between L.high and R.low
            if center.close > center.open && center.close > left.high && left.high < right.low {
                gaps.push(self.build_gap(FvgKind::Bullish, left, right, timeframe, i));
            // Bearish: impulsive down-close leaves a void between R.high and L.low
            } else if center.close < center.open && center.close < left.low && left.low > right.high
            {
                gaps.push(self.build_gap(FvgKind::Bearish, left, right, timeframe, i));
            }
        }

        for gap in &mut gaps {
            self.check_clearing(gap, candles);
        }
        gaps
    }

    fn build_gap(
        &self,
        kind: FvgKind,
        left: &Candle,
        right: &Candle,
        timeframe: Timeframe,
        formation_idx: usize,
    ) -> FairValueGap {
        let (bottom, top, trigger, base) = match kind {
            FvgKind::Bullish => (left.high, right.low, left.low, left.high),
            FvgKind::Bearish => (right.high, left.low, left.high, right.high),
        };
        let gap_size = top - bottom;
        let gap_percentage = if base.is_zero() {
            Decimal::ZERO
        } else {
            gap_size / base * dec!(100)
        };

        FairValueGap {
            kind,
            start_time: left.time,
            end_time: left.time + timeframe.duration_secs() * self.clearing_window as i64,
            formation_time: right.time,
            top_price: top,
            bottom_price: bottom,
            gap_size,
            gap_percentage,
            clearing_trigger_price: trigger,
            cleared: None,
            formation_idx,
        }
    }

    fn check_clearing(&self, gap: &mut FairValueGap, candles: &[Candle]) {
        let start = gap.formation_idx + 1;
        let end = (start + self.clearing_window).min(candles.len());
        for candle in &candles[start..end] {
            let cleared = match gap.kind {
                FvgKind::Bullish => candle.close <= gap.clearing_trigger_price,
                FvgKind::Bearish => candle.close >= gap.clearing_trigger_price,
            };
            if cleared {
                gap.cleared = Some(FvgClearing {
                    cleared_at: candle.time,
                    cleared_by_price: candle.close,
                });
                break;
            }
        }
    }
}
