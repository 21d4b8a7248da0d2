use crate::domain::market::holidays::nth_weekday;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};

/// New York standard time, the historical default for trading-day boundaries.
pub const NEW_YORK_STANDARD_OFFSET: i32 = -5;

/// Returns the UTC weekday of a Unix timestamp.
pub fn weekday_utc(timestamp: i64) -> Weekday {
    utc(timestamp).weekday()
}

/// True when the timestamp falls on Monday through Friday (UTC).
pub fn is_weekday(timestamp: i64) -> bool {
    !matches!(weekday_utc(timestamp), Weekday::Sat | Weekday::Sun)
}

/// US daylight saving window: second Sunday of March up to (excluding) the
/// first Sunday of November.
pub fn is_us_dst(date: NaiveDate) -> bool {
    let start = nth_weekday(date.year(), 3, Weekday::Sun, 2);
    let end = nth_weekday(date.year(), 11, Weekday::Sun, 1);
    date >= start && date < end
}

fn utc(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).expect("candle timestamps are within chrono range")
}

/// Reference-timezone calendar used for trading-day (D1) bucketing and gap
/// classification. The timezone is carried as a signed hour offset, the same
/// descriptor the data backend ships to the chart (`-4` in US summer, `-5`
/// otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingCalendar {
    offset_hours: i32,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::new(NEW_YORK_STANDARD_OFFSET)
    }
}

impl TradingCalendar {
    pub fn new(offset_hours: i32) -> Self {
        debug_assert!((-23..=23).contains(&offset_hours));
        Self { offset_hours }
    }

    /// Builds a New York calendar for a session date, applying the US DST rule.
    pub fn new_york_for(date: NaiveDate) -> Self {
        let offset = if is_us_dst(date) { -4 } else { -5 };
        Self::new(offset)
    }

    pub fn offset_hours(&self) -> i32 {
        self.offset_hours
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.offset_hours * 3600).expect("offset is within a day")
    }

    /// Calendar date of `timestamp` in the reference timezone.
    pub fn session_date(&self, timestamp: i64) -> NaiveDate {
        utc(timestamp).with_timezone(&self.offset()).date_naive()
    }

    /// Start of the trading day containing `timestamp`: midnight of the
    /// reference timezone, expressed as Unix seconds.
    pub fn day_start(&self, timestamp: i64) -> i64 {
        let midnight = self
            .session_date(timestamp)
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid");
        self.offset()
            .from_local_datetime(&midnight)
            .single()
            .expect("fixed offsets have no ambiguous local times")
            .timestamp()
    }

    /// True when both timestamps fall on the same reference-timezone date.
    pub fn same_trading_day(&self, a: i64, b: i64) -> bool {
        self.session_date(a) == self.session_date(b)
    }

    /// Weekend-gap classification for H1/H4 series.
    ///
    /// A gap counts as a weekend close only when the weekday transition matches
    /// the market pattern (Friday into Sunday/Monday, or Saturday into Monday)
    /// and the elapsed span sits in the 30-80 hour window a weekend close
    /// actually produces (Friday ~22:00 through Monday open).
    pub fn is_weekend_gap(&self, last_time: i64, next_time: i64) -> bool {
        let last_day = weekday_utc(last_time);
        let next_day = weekday_utc(next_time);

        let crosses_weekend = matches!(
            (last_day, next_day),
            (Weekday::Fri, Weekday::Sun)
                | (Weekday::Fri, Weekday::Mon)
                | (Weekday::Sat, Weekday::Mon)
        );
        if !crosses_weekend {
            return false;
        }

        let gap_hours = (next_time - last_time) as f64 / 3600.0;
        (30.0..=80.0).contains(&gap_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().timestamp()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_start_crosses_utc_midnight() {
        let cal = TradingCalendar::new(-5);
        // 03:00 UTC is 22:00 of the previous day in New York
        let t = ts(2024, 1, 3, 3, 0);
        assert_eq!(cal.session_date(t), date(2024, 1, 2));
        // NY midnight of Jan 2 is 05:00 UTC on Jan 2
        assert_eq!(cal.day_start(t), ts(2024, 1, 2, 5, 0));
    }

    #[test]
    fn test_day_start_is_idempotent() {
        let cal = TradingCalendar::new(-5);
        let t = ts(2024, 1, 3, 17, 30);
        let start = cal.day_start(t);
        assert_eq!(cal.day_start(start), start);
    }

    #[test]
    fn test_same_trading_day() {
        let cal = TradingCalendar::new(-5);
        // 05:00 UTC = NY midnight; 04:00 UTC next day = NY 23:00 same day
        assert!(cal.same_trading_day(ts(2024, 1, 3, 5, 0), ts(2024, 1, 4, 4, 0)));
        assert!(!cal.same_trading_day(ts(2024, 1, 3, 5, 0), ts(2024, 1, 4, 5, 0)));
    }

    #[test]
    fn test_weekend_gap_detection() {
        let cal = TradingCalendar::default();
        // Friday 21:00 -> Monday 17:00 is 68 hours across the weekend
        assert!(cal.is_weekend_gap(ts(2024, 1, 5, 21, 0), ts(2024, 1, 8, 17, 0)));
        // Friday 21:00 -> Sunday 22:00 (FX reopen) is 49 hours
        assert!(cal.is_weekend_gap(ts(2024, 1, 5, 21, 0), ts(2024, 1, 7, 22, 0)));
        // Mid-week 3 hour gap is not a weekend
        assert!(!cal.is_weekend_gap(ts(2024, 1, 3, 10, 0), ts(2024, 1, 3, 13, 0)));
        // Friday to the *following* Monday (more than a week) exceeds the window
        assert!(!cal.is_weekend_gap(ts(2024, 1, 5, 21, 0), ts(2024, 1, 15, 17, 0)));
        // Tuesday -> Thursday of the same span length is not a weekend pattern
        assert!(!cal.is_weekend_gap(ts(2024, 1, 2, 21, 0), ts(2024, 1, 4, 17, 0)));
    }

    #[test]
    fn test_us_dst_window() {
        // 2024: DST from March 10 through November 3
        assert!(!is_us_dst(date(2024, 3, 9)));
        assert!(is_us_dst(date(2024, 3, 10)));
        assert!(is_us_dst(date(2024, 7, 1)));
        assert!(is_us_dst(date(2024, 11, 2)));
        assert!(!is_us_dst(date(2024, 11, 3)));
    }

    #[test]
    fn test_new_york_for() {
        assert_eq!(TradingCalendar::new_york_for(date(2024, 1, 15)).offset_hours(), -5);
        assert_eq!(TradingCalendar::new_york_for(date(2024, 7, 15)).offset_hours(), -4);
    }

    #[test]
    fn test_weekday_utc() {
        assert_eq!(weekday_utc(ts(2024, 1, 5, 12, 0)), Weekday::Fri);
        assert!(is_weekday(ts(2024, 1, 5, 12, 0)));
        assert!(!is_weekday(ts(2024, 1, 6, 12, 0)));
        assert!(!is_weekday(ts(2024, 1, 7, 12, 0)));
    }
}
