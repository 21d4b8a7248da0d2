use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart timeframes supported by the aggregation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Returns the bucket duration in seconds
    pub const fn duration_secs(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3600,
            Timeframe::H4 => 14400,
            Timeframe::D1 => 86400,
        }
    }

    /// Returns the bucket duration in minutes
    pub const fn duration_minutes(&self) -> i64 {
        self.duration_secs() / 60
    }

    /// Returns the chart label for this timeframe
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }

    /// Returns the start of the bucket containing `timestamp` (Unix seconds).
    ///
    /// All intraday timeframes align on fixed UTC boundaries, so flooring the
    /// epoch is equivalent to flooring the calendar fields (H4 lands on hours
    /// 0/4/8/12/16/20 because the epoch itself is hour-0 aligned). D1 here is
    /// plain UTC midnight; trading-day alignment lives in `TradingCalendar`.
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.duration_secs())
    }

    /// Checks whether `timestamp` is exactly a bucket boundary for this timeframe
    pub fn is_bucket_start(&self, timestamp: i64) -> bool {
        timestamp.rem_euclid(self.duration_secs()) == 0
    }

    /// All timeframes in ascending order
    pub fn all() -> [Timeframe; 6] {
        [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }

    /// The timeframes produced by aggregating M1 candles (everything above M1)
    pub fn aggregated() -> [Timeframe; 5] {
        [
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "m1" | "1m" | "1min" => Ok(Timeframe::M1),
            "m5" | "5m" | "5min" => Ok(Timeframe::M5),
            "m15" | "15m" | "15min" => Ok(Timeframe::M15),
            "h1" | "1h" | "1hour" => Ok(Timeframe::H1),
            "h4" | "4h" | "4hour" => Ok(Timeframe::H4),
            "d1" | "1d" | "1day" => Ok(Timeframe::D1),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: M1, M5, M15, H1, H4, D1",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_duration_secs() {
        assert_eq!(Timeframe::M1.duration_secs(), 60);
        assert_eq!(Timeframe::M5.duration_secs(), 300);
        assert_eq!(Timeframe::M15.duration_secs(), 900);
        assert_eq!(Timeframe::H1.duration_secs(), 3600);
        assert_eq!(Timeframe::H4.duration_secs(), 14400);
        assert_eq!(Timeframe::D1.duration_secs(), 86400);
    }

    #[test]
    fn test_bucket_start_matches_calendar_floor() {
        // 2024-03-06 10:37:00 UTC
        let t = Utc
            .with_ymd_and_hms(2024, 3, 6, 10, 37, 0)
            .unwrap()
            .timestamp();

        let expect = |h: u32, m: u32| {
            Utc.with_ymd_and_hms(2024, 3, 6, h, m, 0)
                .unwrap()
                .timestamp()
        };

        assert_eq!(Timeframe::M1.bucket_start(t), expect(10, 37));
        assert_eq!(Timeframe::M5.bucket_start(t), expect(10, 35));
        assert_eq!(Timeframe::M15.bucket_start(t), expect(10, 30));
        assert_eq!(Timeframe::H1.bucket_start(t), expect(10, 0));
        assert_eq!(Timeframe::H4.bucket_start(t), expect(8, 0));
    }

    #[test]
    fn test_h4_boundaries() {
        for hour in [0u32, 4, 8, 12, 16, 20] {
            let t = Utc
                .with_ymd_and_hms(2024, 3, 6, hour, 0, 0)
                .unwrap()
                .timestamp();
            assert!(Timeframe::H4.is_bucket_start(t), "hour {} not aligned", hour);
        }
        let off = Utc
            .with_ymd_and_hms(2024, 3, 6, 13, 0, 0)
            .unwrap()
            .timestamp();
        assert!(!Timeframe::H4.is_bucket_start(off));
        assert_eq!(
            Timeframe::H4.bucket_start(off),
            Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0)
                .unwrap()
                .timestamp()
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("M5").unwrap(), Timeframe::M5);
        assert_eq!(Timeframe::from_str("5m").unwrap(), Timeframe::M5);
        assert_eq!(Timeframe::from_str("m15").unwrap(), Timeframe::M15);
        assert_eq!(Timeframe::from_str("1h").unwrap(), Timeframe::H1);
        assert_eq!(Timeframe::from_str("4Hour").unwrap(), Timeframe::H4);
        assert_eq!(Timeframe::from_str("D1").unwrap(), Timeframe::D1);
        assert!(Timeframe::from_str("M30").is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Timeframe::M1.label(), "M1");
        assert_eq!(Timeframe::H4.to_string(), "H4");
        assert_eq!(Timeframe::all().len(), 6);
        assert_eq!(Timeframe::aggregated().len(), 5);
        assert!(!Timeframe::aggregated().contains(&Timeframe::M1));
    }
}
