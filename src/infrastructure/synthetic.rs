use crate::domain::market::calendar;
use crate::domain::market::candle::Candle;
use crate::domain::market::timeframe::Timeframe;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::debug;

/// Random-walk M1 candle generator for demos and playback without a data
/// file. Weekend minutes are skipped so the stream resembles an FX feed and
/// exercises the aggregator's weekend handling.
///
/// Seeded, so the same configuration always produces the same stream.
pub struct SyntheticFeed {
    start_time: i64,
    start_price: f64,
    /// Per-bar drift as a fraction of price.
    volatility: f64,
    seed: u64,
}

impl SyntheticFeed {
    pub fn new(start_time: i64, start_price: f64) -> Self {
        Self {
            start_time: Timeframe::M1.bucket_start(start_time),
            start_price,
            volatility: 0.0005,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn generate(&self, bars: usize) -> Vec<Candle> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut candles = Vec::with_capacity(bars);
        let mut time = self.start_time;
        let mut price = self.start_price;

        while candles.len() < bars {
            if !calendar::is_weekday(time) {
                time += Timeframe::M1.duration_secs();
                continue;
            }

            let open = price;
            let drift = open * self.volatility * rng.random_range(-1.0..1.0);
            let close = open + drift;
            let wick = open * self.volatility * rng.random_range(0.0..0.5);
            let high = open.max(close) + wick;
            let low = open.min(close) - wick;
            let volume = rng.random_range(50.0..500.0);

            candles.push(Candle {
                time,
                open: to_price(open),
                high: to_price(high),
                low: to_price(low),
                close: to_price(close),
                volume: to_price(volume),
            });

            price = close;
            time += Timeframe::M1.duration_secs();
        }

        debug!(bars = candles.len(), seed = self.seed, "generated synthetic M1 feed");
        candles
    }
}

fn to_price(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .expect("synthetic prices are finite")
        .round_dp(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().timestamp()
    }

    #[test]
    fn test_generates_requested_bars() {
        let feed = SyntheticFeed::new(ts(2024, 1, 3, 10, 0), 1.1000);
        let candles = feed.generate(120);
        assert_eq!(candles.len(), 120);
        assert!(candles.iter().all(|c| c.is_well_formed()));
        assert!(candles.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let a = SyntheticFeed::new(ts(2024, 1, 3, 10, 0), 1.1000).generate(50);
        let b = SyntheticFeed::new(ts(2024, 1, 3, 10, 0), 1.1000).generate(50);
        assert_eq!(a, b);

        let c = SyntheticFeed::new(ts(2024, 1, 3, 10, 0), 1.1000)
            .with_seed(7)
            .generate(50);
        assert_ne!(a, c);
    }

    #[test]
    fn test_weekend_minutes_skipped() {
        // Start Friday 23:58: the stream must jump to Monday after two bars
        let feed = SyntheticFeed::new(ts(2024, 1, 5, 23, 58), 1.1000);
        let candles = feed.generate(4);

        assert_eq!(candles[0].time, ts(2024, 1, 5, 23, 58));
        assert_eq!(candles[1].time, ts(2024, 1, 5, 23, 59));
        assert_eq!(candles[2].time, ts(2024, 1, 8, 0, 0));
        assert_eq!(candles[3].time, ts(2024, 1, 8, 0, 1));
    }

    #[test]
    fn test_continuous_close_to_open() {
        let candles = SyntheticFeed::new(ts(2024, 1, 3, 10, 0), 1.1000).generate(10);
        for pair in candles.windows(2) {
            assert_eq!(pair[0].close, pair[1].open);
        }
    }
}
