// Market data processing modules
pub mod candle_aggregator;
pub mod continuity;
