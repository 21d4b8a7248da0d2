//! Environment-based configuration for the replay tooling.
//!
//! Values come from the process environment (a `.env` file is honored by the
//! binary before parsing). Invalid values are hard errors rather than silent
//! fallbacks.

use crate::domain::market::calendar::TradingCalendar;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::env;

/// Runtime settings for replay sessions.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Fixed trading-day offset override. When unset, the offset is derived
    /// from the session date via the US DST rule.
    pub ny_offset: Option<i32>,
    /// Backfill non-weekend H1/H4 gaps with flat candles.
    pub gap_fill: bool,
    /// Candles an FVG stays live after formation.
    pub clearing_window: usize,
    /// Sleep between bars during playback; 0 replays as fast as possible.
    pub playback_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ny_offset: None,
            gap_fill: true,
            clearing_window: 40,
            playback_interval_ms: 0,
        }
    }
}

impl ReplayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parses configuration out of any key lookup (tests inject a map).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = get("FVG_NY_OFFSET") {
            let offset: i32 = raw
                .trim()
                .parse()
                .with_context(|| format!("FVG_NY_OFFSET must be an integer hour offset, got '{raw}'"))?;
            if !(-12..=14).contains(&offset) {
                bail!("FVG_NY_OFFSET out of range: {offset} (expected -12..=14)");
            }
            config.ny_offset = Some(offset);
        }

        if let Some(raw) = get("FVG_GAP_FILL") {
            config.gap_fill = parse_bool("FVG_GAP_FILL", &raw)?;
        }

        if let Some(raw) = get("FVG_CLEARING_WINDOW") {
            let window: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("FVG_CLEARING_WINDOW must be a positive integer, got '{raw}'"))?;
            if window == 0 {
                bail!("FVG_CLEARING_WINDOW must be at least 1");
            }
            config.clearing_window = window;
        }

        if let Some(raw) = get("FVG_PLAYBACK_INTERVAL_MS") {
            config.playback_interval_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("FVG_PLAYBACK_INTERVAL_MS must be milliseconds, got '{raw}'"))?;
        }

        Ok(config)
    }

    /// The calendar for a session: the fixed override when set, otherwise New
    /// York with the DST rule applied to the session date.
    pub fn calendar_for(&self, session_date: NaiveDate) -> TradingCalendar {
        match self.ny_offset {
            Some(offset) => TradingCalendar::new(offset),
            None => TradingCalendar::new_york_for(session_date),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean (true/false/1/0), got '{other}'"),
    }
}
