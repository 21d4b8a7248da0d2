use crate::application::market_data::candle_aggregator::CandleAggregator;
use crate::domain::market::candle::{Candle, CandleUpdate};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::CandleSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Drives an M1 candle feed through the aggregator one bar at a time and fans
/// the per-timeframe updates out to the registered sinks, the way the chart's
/// playback loop consumes a session.
///
/// The driver owns the aggregator; everything runs on the caller's thread.
/// Sinks are notified in ascending timeframe order so a consumer sees a
/// deterministic sequence for every bar.
pub struct PlaybackDriver {
    aggregator: CandleAggregator,
    feed: Vec<Candle>,
    cursor: usize,
    sinks: Vec<Arc<dyn CandleSink>>,
    pacing: Option<Duration>,
}

impl PlaybackDriver {
    pub fn new(aggregator: CandleAggregator, feed: Vec<Candle>) -> Self {
        Self {
            aggregator,
            feed,
            cursor: 0,
            sinks: Vec::new(),
            pacing: None,
        }
    }

    /// Sleep this long after each bar, approximating live replay speed.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = if interval.is_zero() { None } else { Some(interval) };
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn CandleSink>) {
        self.sinks.push(sink);
    }

    pub fn aggregator(&self) -> &CandleAggregator {
        &self.aggregator
    }

    /// (bars played, bars total)
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor, self.feed.len())
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.feed.len()
    }

    /// Plays one bar. Returns false once the feed is exhausted.
    pub fn step(&mut self) -> bool {
        let Some(candle) = self.feed.get(self.cursor).cloned() else {
            return false;
        };
        self.cursor += 1;

        let updates = self.aggregator.add_m1_candle(candle);
        for timeframe in Timeframe::all() {
            if let Some(update) = updates.get(&timeframe) {
                for sink in &self.sinks {
                    sink.on_update(timeframe, update);
                }
            }
        }

        if let Some(interval) = self.pacing {
            std::thread::sleep(interval);
        }
        true
    }

    /// Plays the remaining feed to the end; returns the number of bars played.
    pub fn run_to_end(&mut self) -> usize {
        let start = self.cursor;
        while self.step() {}
        let played = self.cursor - start;
        info!(bars = played, "playback finished");
        played
    }

    /// Starts a fresh session over a new feed: aggregation state is cleared,
    /// the cursor rewinds and sinks are told to drop their series.
    pub fn restart(&mut self, feed: Vec<Candle>) {
        self.aggregator.reset();
        self.feed = feed;
        self.cursor = 0;
        for sink in &self.sinks {
            sink.on_session_reset();
        }
    }
}

/// Captures every update it sees; the test-side stand-in for a chart.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Timeframe, CandleUpdate)>>,
    resets: Mutex<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Timeframe, CandleUpdate)> {
        self.events.lock().expect("recording sink lock").clone()
    }

    pub fn reset_count(&self) -> usize {
        *self.resets.lock().expect("recording sink lock")
    }
}

impl CandleSink for RecordingSink {
    fn on_update(&self, timeframe: Timeframe, update: &CandleUpdate) {
        self.events
            .lock()
            .expect("recording sink lock")
            .push((timeframe, update.clone()));
    }

    fn on_session_reset(&self) {
        *self.resets.lock().expect("recording sink lock") += 1;
        self.events.lock().expect("recording sink lock").clear();
    }
}

/// Forwards updates over a channel, decoupling a rendering/UI thread from the
/// playback thread. A disconnected receiver is ignored so a closed UI never
/// stalls playback.
pub struct ChannelSink {
    sender: crossbeam_channel::Sender<(Timeframe, CandleUpdate)>,
}

impl ChannelSink {
    pub fn new(sender: crossbeam_channel::Sender<(Timeframe, CandleUpdate)>) -> Self {
        Self { sender }
    }
}

impl CandleSink for ChannelSink {
    fn on_update(&self, timeframe: Timeframe, update: &CandleUpdate) {
        let _ = self.sender.send((timeframe, update.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::UpdateKind;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn feed(bars: usize) -> Vec<Candle> {
        let base = Utc
            .with_ymd_and_hms(2024, 1, 3, 10, 0, 0)
            .unwrap()
            .timestamp();
        (0..bars)
            .map(|i| Candle {
                time: base + i as i64 * 60,
                open: dec!(1.1000),
                high: dec!(1.1005),
                low: dec!(1.0995),
                close: dec!(1.1002),
                volume: dec!(10),
            })
            .collect()
    }

    #[test]
    fn test_step_fans_out_to_sinks() {
        let sink = Arc::new(RecordingSink::new());
        let mut driver = PlaybackDriver::new(CandleAggregator::default(), feed(1));
        driver.add_sink(sink.clone());

        assert!(driver.step());
        assert!(!driver.step());

        let events = sink.events();
        // One update per timeframe for the single bar
        assert_eq!(events.len(), Timeframe::all().len());
        assert!(events.iter().all(|(_, u)| u.kind == UpdateKind::New));
        // Deterministic ordering: M1 first, D1 last
        assert_eq!(events.first().unwrap().0, Timeframe::M1);
        assert_eq!(events.last().unwrap().0, Timeframe::D1);
    }

    #[test]
    fn test_run_to_end() {
        let sink = Arc::new(RecordingSink::new());
        let mut driver = PlaybackDriver::new(CandleAggregator::default(), feed(7));
        driver.add_sink(sink.clone());

        assert_eq!(driver.run_to_end(), 7);
        assert!(driver.is_finished());
        assert_eq!(driver.progress(), (7, 7));
        assert_eq!(sink.events().len(), 7 * Timeframe::all().len());
        assert_eq!(driver.aggregator().get_all_candles(Timeframe::M1).len(), 7);
    }

    #[test]
    fn test_restart_clears_session() {
        let sink = Arc::new(RecordingSink::new());
        let mut driver = PlaybackDriver::new(CandleAggregator::default(), feed(5));
        driver.add_sink(sink.clone());
        driver.run_to_end();

        driver.restart(feed(3));
        assert_eq!(driver.progress(), (0, 3));
        assert_eq!(sink.reset_count(), 1);
        assert!(sink.events().is_empty());
        assert!(driver.aggregator().get_all_candles(Timeframe::M1).is_empty());

        driver.run_to_end();
        assert_eq!(driver.aggregator().get_all_candles(Timeframe::M1).len(), 3);
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut driver = PlaybackDriver::new(CandleAggregator::default(), feed(2));
        driver.add_sink(Arc::new(ChannelSink::new(tx)));
        driver.run_to_end();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 2 * Timeframe::all().len());
    }

    #[test]
    fn test_channel_sink_survives_disconnected_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let mut driver = PlaybackDriver::new(CandleAggregator::default(), feed(2));
        driver.add_sink(Arc::new(ChannelSink::new(tx)));
        assert_eq!(driver.run_to_end(), 2);
    }
}
