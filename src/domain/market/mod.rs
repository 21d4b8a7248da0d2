// Market data domain
pub mod calendar;
pub mod candle;
pub mod fvg;
pub mod holidays;
pub mod timeframe;
