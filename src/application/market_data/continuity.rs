use crate::domain::market::calendar::{self, TradingCalendar};
use crate::domain::market::candle::Candle;
use crate::domain::market::holidays::USHolidayCalendar;
use crate::domain::market::timeframe::Timeframe;
use serde::Serialize;
use tracing::debug;

/// Why a stretch of buckets is missing from a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapClass {
    /// Market closed over the weekend.
    Weekend,
    /// Market closed for a US holiday.
    Holiday,
    /// Buckets that should have traded are absent: real data loss.
    DataLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapRecord {
    /// Last candle before the gap.
    pub start_time: i64,
    /// First candle after the gap.
    pub end_time: i64,
    /// Trading buckets (weekday, non-holiday) missing inside the gap.
    pub missing_buckets: u32,
    pub class: GapClass,
}

/// Result of a continuity scan over one timeframe's series.
#[derive(Debug, Clone, Serialize)]
pub struct ContinuityReport {
    pub timeframe: Timeframe,
    pub total_candles: usize,
    /// Timestamps that appeared more than once.
    pub duplicates: Vec<i64>,
    /// Gaps fully explained by market closures.
    pub expected_closures: Vec<GapRecord>,
    /// Gaps with trading buckets unaccounted for.
    pub data_gaps: Vec<GapRecord>,
}

impl ContinuityReport {
    pub fn is_continuous(&self) -> bool {
        self.duplicates.is_empty() && self.data_gaps.is_empty()
    }

    pub fn missing_total(&self) -> u32 {
        self.data_gaps.iter().map(|g| g.missing_buckets).sum()
    }
}

/// Scans candle series for duplicate timestamps and missing buckets,
/// separating expected market closures from genuine data loss.
///
/// Pure inspection: the input is read as-is (it must already be sorted the
/// way the aggregator emits it) and nothing is mutated or filled.
pub struct ContinuityChecker {
    calendar: TradingCalendar,
    holidays: USHolidayCalendar,
}

impl Default for ContinuityChecker {
    fn default() -> Self {
        Self::new(TradingCalendar::default())
    }
}

impl ContinuityChecker {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self {
            calendar,
            holidays: USHolidayCalendar::new(),
        }
    }

    pub fn check(&self, candles: &[Candle], timeframe: Timeframe) -> ContinuityReport {
        let mut report = ContinuityReport {
            timeframe,
            total_candles: candles.len(),
            duplicates: Vec::new(),
            expected_closures: Vec::new(),
            data_gaps: Vec::new(),
        };

        let duration = timeframe.duration_secs();
        for pair in candles.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let delta = curr.time - prev.time;

            if delta == 0 {
                report.duplicates.push(curr.time);
                continue;
            }
            if delta <= duration {
                continue;
            }

            report.push_gap(self.classify_gap(prev.time, curr.time, duration));
        }

        debug!(
            timeframe = %timeframe,
            candles = report.total_candles,
            closures = report.expected_closures.len(),
            data_gaps = report.data_gaps.len(),
            "continuity scan finished"
        );
        report
    }

    /// A gap matching the weekend pattern (Fri/Sat into Sun/Mon within the
    /// 30-80h window) is a weekend closure outright. Otherwise the missing
    /// buckets are walked: a gap explained entirely by holidays (possibly
    /// flanked by weekend days) is a holiday closure, and anything with live
    /// trading buckets absent is data loss.
    fn classify_gap(&self, start: i64, end: i64, duration: i64) -> GapRecord {
        if self.calendar.is_weekend_gap(start, end) {
            return GapRecord {
                start_time: start,
                end_time: end,
                missing_buckets: 0,
                class: GapClass::Weekend,
            };
        }

        let mut missing = 0u32;
        let mut saw_holiday = false;

        let mut bucket = start + duration;
        while bucket < end {
            if calendar::is_weekday(bucket) {
                if self.holidays.is_market_holiday(self.calendar.session_date(bucket)) {
                    saw_holiday = true;
                } else {
                    missing += 1;
                }
            }
            bucket += duration;
        }

        let class = if missing > 0 {
            GapClass::DataLoss
        } else if saw_holiday {
            GapClass::Holiday
        } else {
            GapClass::Weekend
        };

        GapRecord {
            start_time: start,
            end_time: end,
            missing_buckets: missing,
            class,
        }
    }
}

impl ContinuityReport {
    fn push_gap(&mut self, gap: GapRecord) {
        match gap.class {
            GapClass::DataLoss => self.data_gaps.push(gap),
            _ => self.expected_closures.push(gap),
        }
    }
}
