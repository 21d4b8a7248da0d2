use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Returns the n-th occurrence of `weekday` in the given month (`n >= 1`), or
/// the last occurrence when `n == -1`.
pub(crate) fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: i32) -> NaiveDate {
    if n > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .expect("valid year/month always has a first day");
        let offset =
            (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
        first + Duration::days(i64::from(offset) + i64::from(n as u32 - 1) * 7)
    } else {
        let last_day = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .expect("valid year/month")
            - Duration::days(1);
        let back =
            (last_day.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
        last_day - Duration::days(i64::from(back))
    }
}

/// US equity market holiday calendar.
///
/// Covers the closures that show up as multi-day gaps in FX/index M1 history.
/// Fixed-date holidays observe the usual shift: Saturday moves to Friday,
/// Sunday moves to Monday.
#[derive(Debug, Clone, Copy, Default)]
pub struct USHolidayCalendar;

impl USHolidayCalendar {
    pub fn new() -> Self {
        Self
    }

    /// Returns the holiday name if the market is closed on `date`.
    pub fn holiday_name(&self, date: NaiveDate) -> Option<&'static str> {
        let year = date.year();

        for (month, day, name) in [
            (1u32, 1u32, "New Year's Day"),
            (6, 19, "Juneteenth"),
            (7, 4, "Independence Day"),
            (12, 25, "Christmas Day"),
        ] {
            let holiday =
                NaiveDate::from_ymd_opt(year, month, day).expect("fixed holiday date is valid");
            if date == Self::observed(holiday) {
                return Some(name);
            }
        }

        if date == nth_weekday(year, 1, Weekday::Mon, 3) {
            return Some("Martin Luther King Jr. Day");
        }
        if date == nth_weekday(year, 2, Weekday::Mon, 3) {
            return Some("Presidents' Day");
        }
        if date == nth_weekday(year, 5, Weekday::Mon, -1) {
            return Some("Memorial Day");
        }
        if date == nth_weekday(year, 9, Weekday::Mon, 1) {
            return Some("Labor Day");
        }
        if date == nth_weekday(year, 11, Weekday::Thu, 4) {
            return Some("Thanksgiving");
        }

        None
    }

    pub fn is_market_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_name(date).is_some()
    }

    /// Shortened sessions: the day after Thanksgiving, Christmas Eve and New
    /// Year's Eve (when they fall on a weekday).
    pub fn is_early_close(&self, date: NaiveDate) -> bool {
        let year = date.year();
        if date == nth_weekday(year, 11, Weekday::Thu, 4) + Duration::days(1) {
            return true;
        }
        let is_weekday = !matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        is_weekday && ((date.month() == 12 && date.day() == 24)
            || (date.month() == 12 && date.day() == 31))
    }

    fn observed(holiday: NaiveDate) -> NaiveDate {
        match holiday.weekday() {
            Weekday::Sat => holiday - Duration::days(1),
            Weekday::Sun => holiday + Duration::days(1),
            _ => holiday,
        }
    }
}
