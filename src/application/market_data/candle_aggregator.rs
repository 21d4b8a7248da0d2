use crate::domain::market::calendar::{self, TradingCalendar};
use crate::domain::market::candle::{Candle, CandleUpdate, UpdateKind};
use crate::domain::market::timeframe::Timeframe;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Incremental multi-timeframe candle aggregation engine.
///
/// Consumes a stream of M1 candles (strictly non-decreasing time, the caller
/// is the sole producer of ordering) and maintains, in one forward pass, the
/// open and completed candles of every coarser timeframe. Each call returns a
/// per-timeframe update descriptor the chart layer applies incrementally:
/// `New` appends a bar, `Update` rewrites the last one.
///
/// Intraday buckets align on fixed UTC boundaries; D1 buckets follow trading
/// days in the reference timezone carried by `TradingCalendar`. H1/H4 series
/// additionally detect time gaps between consecutive buckets: weekend closes
/// stay unfilled, anything else is padded with flat zero-volume candles on
/// weekday buckets so indicator windows keep their spacing.
///
/// Single-threaded by design. The aggregator is mutated only through
/// `add_m1_candle` and `reset`; callers serialize access.
pub struct CandleAggregator {
    /// At most one in-progress candle per aggregated timeframe.
    open_candles: HashMap<Timeframe, Candle>,
    /// Finalized candles per timeframe, append-only and chronological.
    completed: HashMap<Timeframe, Vec<Candle>>,
    calendar: TradingCalendar,
    /// Time of the most recent M1 input, kept for day-boundary diagnostics.
    last_processed_time: Option<i64>,
    fill_intraday_gaps: bool,
}

impl Default for CandleAggregator {
    fn default() -> Self {
        Self::new(TradingCalendar::default())
    }
}

impl CandleAggregator {
    pub fn new(calendar: TradingCalendar) -> Self {
        Self {
            open_candles: HashMap::new(),
            completed: Timeframe::all().iter().map(|tf| (*tf, Vec::new())).collect(),
            calendar,
            last_processed_time: None,
            fill_intraday_gaps: true,
        }
    }

    /// Clears all aggregation state. Used when switching instrument or data
    /// file; the calendar and gap-fill policy survive the reset.
    pub fn reset(&mut self) {
        self.open_candles.clear();
        for series in self.completed.values_mut() {
            series.clear();
        }
        self.last_processed_time = None;
    }

    /// Replaces the reference-timezone calendar. Idempotent; only affects D1
    /// bucketing of candles processed afterwards.
    pub fn set_timezone_info(&mut self, calendar: TradingCalendar) {
        self.calendar = calendar;
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Disables (or re-enables) flat-candle backfill of non-weekend H1/H4 gaps.
    pub fn set_fill_intraday_gaps(&mut self, fill: bool) {
        self.fill_intraday_gaps = fill;
    }

    /// Ingests one M1 candle and returns the resulting update for every
    /// timeframe. M1 itself is simply recorded as a completed bar.
    ///
    /// Never fails: chronology anomalies are absorbed by force-closing the
    /// mismatched open candle (see `update_timeframe`), and OHLC values are
    /// taken as-is; validation belongs upstream.
    pub fn add_m1_candle(&mut self, candle: Candle) -> HashMap<Timeframe, CandleUpdate> {
        self.note_day_boundary(candle.time);

        let mut updates = HashMap::with_capacity(Timeframe::all().len());
        self.series_mut(Timeframe::M1).push(candle.clone());
        updates.insert(
            Timeframe::M1,
            CandleUpdate {
                kind: UpdateKind::New,
                candle: candle.clone(),
            },
        );

        for tf in Timeframe::aggregated() {
            updates.insert(tf, self.update_timeframe(tf, &candle));
        }

        self.last_processed_time = Some(candle.time);
        updates
    }

    /// Completed candles followed by the open candle (aggregated timeframes
    /// only), as a fresh vector for full chart redraws.
    pub fn get_all_candles(&self, timeframe: Timeframe) -> Vec<Candle> {
        let mut candles = self.completed[&timeframe].clone();
        if timeframe != Timeframe::M1
            && let Some(open) = self.open_candles.get(&timeframe)
        {
            candles.push(open.clone());
        }
        candles
    }

    pub fn completed_candles(&self, timeframe: Timeframe) -> &[Candle] {
        &self.completed[&timeframe]
    }

    pub fn open_candle(&self, timeframe: Timeframe) -> Option<&Candle> {
        self.open_candles.get(&timeframe)
    }

    /// Bucket start of `timestamp` for a timeframe: UTC flooring intraday,
    /// trading-day midnight for D1.
    fn aligned_time(&self, timeframe: Timeframe, timestamp: i64) -> i64 {
        match timeframe {
            Timeframe::D1 => self.calendar.day_start(timestamp),
            tf => tf.bucket_start(timestamp),
        }
    }

    fn update_timeframe(&mut self, timeframe: Timeframe, m1: &Candle) -> CandleUpdate {
        let aligned = self.aligned_time(timeframe, m1.time);

        if let Some(open) = self.open_candles.get_mut(&timeframe) {
            if open.time == aligned {
                open.merge(m1);
                return CandleUpdate {
                    kind: UpdateKind::Update,
                    candle: open.clone(),
                };
            }

            // Bucket changed: finalize the open candle and roll over.
            let closed = self
                .open_candles
                .remove(&timeframe)
                .expect("open candle verified to exist by get_mut check");
            if aligned < closed.time {
                // Out-of-order input. Self-heal by force-closing; the stale
                // candle stays in the series and aggregation restarts at the
                // incoming bucket.
                warn!(
                    timeframe = %timeframe,
                    open_time = closed.time,
                    aligned_time = aligned,
                    "bucket time mismatch, force-closing open candle"
                );
            }
            self.close_candle(timeframe, closed, aligned);
        }

        let fresh = Candle {
            time: aligned,
            open: m1.open,
            high: m1.high,
            low: m1.low,
            close: m1.close,
            volume: m1.volume,
        };
        self.open_candles.insert(timeframe, fresh.clone());
        CandleUpdate {
            kind: UpdateKind::New,
            candle: fresh,
        }
    }

    fn close_candle(&mut self, timeframe: Timeframe, closed: Candle, next_aligned: i64) {
        self.series_mut(timeframe).push(closed.clone());
        if matches!(timeframe, Timeframe::H1 | Timeframe::H4) && next_aligned > closed.time {
            self.backfill_gap(timeframe, &closed, next_aligned);
        }
    }

    /// H1/H4 gap handling: pads every missing weekday bucket between the
    /// closed candle and the next real one with a flat candle at the previous
    /// close, unless the gap is a weekend close.
    fn backfill_gap(&mut self, timeframe: Timeframe, closed: &Candle, aligned: i64) {
        let duration = timeframe.duration_secs();
        let next_expected = closed.time + duration;
        if aligned <= next_expected {
            return;
        }

        let gap_hours = (aligned - next_expected) as f64 / 3600.0;
        warn!(
            timeframe = %timeframe,
            expected = next_expected,
            actual = aligned,
            gap_hours,
            "time gap between consecutive buckets"
        );

        if self.calendar.is_weekend_gap(closed.time, aligned) {
            debug!(timeframe = %timeframe, "weekend gap, leaving unfilled");
            return;
        }
        if !self.fill_intraday_gaps {
            return;
        }

        let fill_price = closed.close;
        let series = self.series_mut(timeframe);
        let mut bucket = next_expected;
        let mut filled = 0u32;
        while bucket < aligned {
            // Saturday/Sunday buckets are skipped even inside a filled gap.
            if calendar::is_weekday(bucket) {
                series.push(Candle::flat(bucket, fill_price));
                filled += 1;
            }
            bucket += duration;
        }
        if filled > 0 {
            info!(timeframe = %timeframe, filled, "backfilled missing candles");
        }
    }

    fn note_day_boundary(&mut self, time: i64) {
        if let Some(last) = self.last_processed_time
            && !self.calendar.same_trading_day(last, time)
        {
            debug!(
                from = %self.calendar.session_date(last),
                to = %self.calendar.session_date(time),
                "trading day boundary crossed"
            );
        }
    }

    fn series_mut(&mut self, timeframe: Timeframe) -> &mut Vec<Candle> {
        self.completed
            .get_mut(&timeframe)
            .expect("completed series pre-seeded for every timeframe")
    }
}
