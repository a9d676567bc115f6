//! Symbolic date ranges (`last_7_days`, `current_month`, ...).
//!
//! Weeks start on Sunday. Ranges ending at a month or year boundary end on
//! its last microsecond so they can be used with `BETWEEN`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// A relative date token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativeDate {
    LastFullWeek,
    LastTwoFullWeeks,
    Last7Days,
    Last14Days,
    Last30Days,
    Last45Days,
    Last60Days,
    Next7Days,
    Next14Days,
    Next30Days,
    Next45Days,
    Next60Days,
    NextWeek,
    CurrentWeek,
    CurrentMonth,
    CurrentAndNextMonth,
    CurrentYear,
    LastMonth,
    NextMonth,
    NextYear,
    Past,
    PastAndToday,
    Future,
    FutureAndToday,
    Yesterday,
    Today,
    Tomorrow,
    PastAndFuture,
    TwoWeeksPastEndOfMonth,
}

impl RelativeDate {
    pub const ALL: [RelativeDate; 29] = [
        RelativeDate::LastFullWeek,
        RelativeDate::LastTwoFullWeeks,
        RelativeDate::Last7Days,
        RelativeDate::Last14Days,
        RelativeDate::Last30Days,
        RelativeDate::Last45Days,
        RelativeDate::Last60Days,
        RelativeDate::Next7Days,
        RelativeDate::Next14Days,
        RelativeDate::Next30Days,
        RelativeDate::Next45Days,
        RelativeDate::Next60Days,
        RelativeDate::NextWeek,
        RelativeDate::CurrentWeek,
        RelativeDate::CurrentMonth,
        RelativeDate::CurrentAndNextMonth,
        RelativeDate::CurrentYear,
        RelativeDate::LastMonth,
        RelativeDate::NextMonth,
        RelativeDate::NextYear,
        RelativeDate::Past,
        RelativeDate::PastAndToday,
        RelativeDate::Future,
        RelativeDate::FutureAndToday,
        RelativeDate::Yesterday,
        RelativeDate::Today,
        RelativeDate::Tomorrow,
        RelativeDate::PastAndFuture,
        RelativeDate::TwoWeeksPastEndOfMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelativeDate::LastFullWeek => "last_full_week",
            RelativeDate::LastTwoFullWeeks => "last_two_full_weeks",
            RelativeDate::Last7Days => "last_7_days",
            RelativeDate::Last14Days => "last_14_days",
            RelativeDate::Last30Days => "last_30_days",
            RelativeDate::Last45Days => "last_45_days",
            RelativeDate::Last60Days => "last_60_days",
            RelativeDate::Next7Days => "next_7_days",
            RelativeDate::Next14Days => "next_14_days",
            RelativeDate::Next30Days => "next_30_days",
            RelativeDate::Next45Days => "next_45_days",
            RelativeDate::Next60Days => "next_60_days",
            RelativeDate::NextWeek => "next_week",
            RelativeDate::CurrentWeek => "current_week",
            RelativeDate::CurrentMonth => "current_month",
            RelativeDate::CurrentAndNextMonth => "current_and_next_month",
            RelativeDate::CurrentYear => "current_year",
            RelativeDate::LastMonth => "last_month",
            RelativeDate::NextMonth => "next_month",
            RelativeDate::NextYear => "next_year",
            RelativeDate::Past => "past",
            RelativeDate::PastAndToday => "past_and_today",
            RelativeDate::Future => "future",
            RelativeDate::FutureAndToday => "future_and_today",
            RelativeDate::Yesterday => "yesterday",
            RelativeDate::Today => "today",
            RelativeDate::Tomorrow => "tomorrow",
            RelativeDate::PastAndFuture => "past_and_future",
            RelativeDate::TwoWeeksPastEndOfMonth => "two_weeks_past_end_of_month",
        }
    }

    /// Look up a token after lower-casing it and turning spaces into
    /// underscores, so `"Last 7 Days"` works.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        Self::ALL.into_iter().find(|token| token.as_str() == normalized)
    }

    /// The concrete `(start, end)` range this token covers at `now`.
    pub fn interpret(self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let a_few_seconds = Duration::seconds(3);
        let one_day = Duration::days(1);
        let days = Duration::days;

        let beginning_today = midnight(now.date());
        let end_today = beginning_today + one_day;
        let weekstart = beginning_today - days(i64::from(now.weekday().num_days_from_sunday()));
        let epoch = NaiveDateTime::default();
        let far_future = jan_first(now.year() + 1000);

        match self {
            RelativeDate::LastFullWeek => (weekstart - days(7), weekstart),
            RelativeDate::LastTwoFullWeeks => (weekstart - days(14), weekstart),
            RelativeDate::Last7Days => (now - days(7), now + a_few_seconds),
            RelativeDate::Last14Days => (now - days(14), now + a_few_seconds),
            RelativeDate::Last30Days => (now - days(30), now + a_few_seconds),
            RelativeDate::Last45Days => (now - days(45), now + a_few_seconds),
            RelativeDate::Last60Days => (now - days(60), now + a_few_seconds),
            RelativeDate::Next7Days => (now, now + days(7)),
            RelativeDate::Next14Days => (now, now + days(14)),
            RelativeDate::Next30Days => (now, now + days(30)),
            RelativeDate::Next45Days => (now, now + days(45)),
            RelativeDate::Next60Days => (now, now + days(60)),
            RelativeDate::NextWeek => (weekstart + days(7), weekstart + days(14)),
            RelativeDate::CurrentWeek => (weekstart, weekstart + days(7)),
            RelativeDate::CurrentMonth => (first_day_of_month(now), last_day_of_month(now)),
            RelativeDate::CurrentAndNextMonth => {
                let start = first_day_of_month(now);
                (start, last_day_of_month(start + days(45)))
            }
            RelativeDate::TwoWeeksPastEndOfMonth => {
                (first_day_of_month(now), last_day_of_month(now) + days(14))
            }
            RelativeDate::CurrentYear => (jan_first(now.year()), end_of_year(now.year())),
            RelativeDate::NextYear => (jan_first(now.year() + 1), end_of_year(now.year() + 1)),
            RelativeDate::LastMonth => {
                let last_month = first_day_of_month(now) - days(2);
                (first_day_of_month(last_month), last_day_of_month(last_month))
            }
            RelativeDate::NextMonth => {
                let next_month = last_day_of_month(now) + days(2);
                (first_day_of_month(next_month), last_day_of_month(next_month))
            }
            RelativeDate::Past => (epoch, beginning_today - Duration::microseconds(1)),
            RelativeDate::PastAndToday => (epoch, now),
            RelativeDate::Future => (now, far_future),
            RelativeDate::FutureAndToday => (beginning_today, far_future),
            RelativeDate::PastAndFuture => (epoch, far_future),
            RelativeDate::Yesterday => (beginning_today - one_day, beginning_today),
            RelativeDate::Today => (beginning_today, end_today),
            RelativeDate::Tomorrow => (end_today, end_today + one_day),
        }
    }
}

impl std::fmt::Display for RelativeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn jan_first(year: i32) -> NaiveDateTime {
    midnight(NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MAX))
}

fn end_of_year(year: i32) -> NaiveDateTime {
    jan_first(year + 1) - Duration::microseconds(1)
}

fn first_day_of_month(dt: NaiveDateTime) -> NaiveDateTime {
    midnight(dt.date().with_day(1).unwrap_or(dt.date()))
}

fn last_day_of_month(dt: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if dt.month() == 12 {
        (dt.year() + 1, 1)
    } else {
        (dt.year(), dt.month() + 1)
    };
    let next = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX);
    midnight(next) - Duration::microseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn end_of(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap()
    }

    // Wednesday
    fn now() -> NaiveDateTime {
        at(2026, 10, 14, 15, 30)
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(RelativeDate::parse("Last 7 Days"), Some(RelativeDate::Last7Days));
        assert_eq!(RelativeDate::parse("current_month"), Some(RelativeDate::CurrentMonth));
        assert_eq!(RelativeDate::parse("last 8 days"), None);
        assert_eq!(RelativeDate::parse("current_and_next_year"), None);
        assert_eq!(RelativeDate::parse("two_weeks_past_end_of_year"), None);
    }

    #[test]
    fn test_every_token_round_trips() {
        for token in RelativeDate::ALL {
            assert_eq!(RelativeDate::parse(token.as_str()), Some(token));
        }
    }

    #[test]
    fn test_weeks_start_on_sunday() {
        assert_eq!(
            RelativeDate::CurrentWeek.interpret(now()),
            (at(2026, 10, 11, 0, 0), at(2026, 10, 18, 0, 0))
        );
        assert_eq!(
            RelativeDate::LastFullWeek.interpret(now()),
            (at(2026, 10, 4, 0, 0), at(2026, 10, 11, 0, 0))
        );
        assert_eq!(
            RelativeDate::NextWeek.interpret(now()),
            (at(2026, 10, 18, 0, 0), at(2026, 10, 25, 0, 0))
        );
    }

    #[test]
    fn test_days() {
        let (start, end) = RelativeDate::Last7Days.interpret(now());
        assert_eq!(start, at(2026, 10, 7, 15, 30));
        assert_eq!(end, now() + Duration::seconds(3));

        assert_eq!(
            RelativeDate::Today.interpret(now()),
            (at(2026, 10, 14, 0, 0), at(2026, 10, 15, 0, 0))
        );
        assert_eq!(
            RelativeDate::Yesterday.interpret(now()),
            (at(2026, 10, 13, 0, 0), at(2026, 10, 14, 0, 0))
        );
    }

    #[test]
    fn test_months() {
        assert_eq!(
            RelativeDate::CurrentMonth.interpret(now()),
            (at(2026, 10, 1, 0, 0), end_of(2026, 10, 31))
        );
        assert_eq!(
            RelativeDate::LastMonth.interpret(now()),
            (at(2026, 9, 1, 0, 0), end_of(2026, 9, 30))
        );
        assert_eq!(
            RelativeDate::NextMonth.interpret(now()),
            (at(2026, 11, 1, 0, 0), end_of(2026, 11, 30))
        );
        assert_eq!(
            RelativeDate::CurrentAndNextMonth.interpret(now()),
            (at(2026, 10, 1, 0, 0), end_of(2026, 11, 30))
        );
        // december rolls into the next year
        assert_eq!(
            RelativeDate::NextMonth.interpret(at(2026, 12, 31, 9, 0)),
            (at(2027, 1, 1, 0, 0), end_of(2027, 1, 31))
        );
    }

    #[test]
    fn test_years_and_open_ranges() {
        assert_eq!(
            RelativeDate::CurrentYear.interpret(now()),
            (at(2026, 1, 1, 0, 0), end_of(2026, 12, 31))
        );
        assert_eq!(
            RelativeDate::NextYear.interpret(now()),
            (at(2027, 1, 1, 0, 0), end_of(2027, 12, 31))
        );
        let (start, end) = RelativeDate::Past.interpret(now());
        assert_eq!(start, at(1970, 1, 1, 0, 0));
        assert_eq!(end, end_of(2026, 10, 13));
        assert_eq!(RelativeDate::Future.interpret(now()).1, at(3026, 1, 1, 0, 0));
    }
}
