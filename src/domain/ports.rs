use crate::domain::market::candle::CandleUpdate;
use crate::domain::market::timeframe::Timeframe;

/// Consumer of incremental chart updates.
///
/// The rendering layer (chart series, overlays) sits behind this trait; the
/// playback driver fans every per-timeframe update out to all registered
/// sinks. Implementations must not block: the driver calls them synchronously
/// on the playback thread.
pub trait CandleSink: Send + Sync {
    fn on_update(&self, timeframe: Timeframe, update: &CandleUpdate);

    /// Called when a playback session restarts (new data file or instrument).
    fn on_session_reset(&self) {}
}
