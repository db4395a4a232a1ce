//! Calendar period windows
//!
//! A reference date and a period unit yield two adjacent half-open windows:
//! the period containing the date and the one immediately before it. The
//! previous window always ends exactly where the current one starts.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Granularity of a reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

impl PeriodUnit {
    pub fn all() -> &'static [PeriodUnit] {
        &[Self::Day, Self::Week, Self::Month]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::str::FromStr for PeriodUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(format!(
                "Unknown period unit: '{}' (expected day, week, or month)",
                s
            )),
        }
    }
}

impl std::fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    /// Window of `days` calendar days ending at `as_of` (exclusive)
    pub fn lookback(as_of: NaiveDateTime, days: u32) -> Result<Self> {
        let start = as_of
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "Lookback of {} days from {} is out of range",
                    days, as_of
                ))
            })?;
        Ok(Self { start, end: as_of })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Current and previous windows for a reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindows {
    pub current: Window,
    pub previous: Window,
}

/// Compute the current and previous windows for `date` at `unit` granularity
pub fn windows(date: NaiveDate, unit: PeriodUnit) -> Result<PeriodWindows> {
    let (current_start, current_end, previous_start) = match unit {
        PeriodUnit::Day => (
            date,
            shift_days(date, 1, true)?,
            shift_days(date, 1, false)?,
        ),
        PeriodUnit::Week => {
            // Monday is day 0; Sunday stays in the week that ends on it
            let back = u64::from(date.weekday().num_days_from_monday());
            let monday = shift_days(date, back, false)?;
            (
                monday,
                shift_days(monday, 7, true)?,
                shift_days(monday, 7, false)?,
            )
        }
        PeriodUnit::Month => {
            let first = date.with_day(1).ok_or_else(|| out_of_range(date))?;
            (
                first,
                first
                    .checked_add_months(Months::new(1))
                    .ok_or_else(|| out_of_range(date))?,
                first
                    .checked_sub_months(Months::new(1))
                    .ok_or_else(|| out_of_range(date))?,
            )
        }
    };

    Ok(PeriodWindows {
        current: Window {
            start: midnight(current_start),
            end: midnight(current_end),
        },
        previous: Window {
            start: midnight(previous_start),
            end: midnight(current_start),
        },
    })
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn shift_days(date: NaiveDate, days: u64, forward: bool) -> Result<NaiveDate> {
    let shifted = if forward {
        date.checked_add_days(Days::new(days))
    } else {
        date.checked_sub_days(Days::new(days))
    };
    shifted.ok_or_else(|| out_of_range(date))
}

fn out_of_range(date: NaiveDate) -> Error {
    Error::InvalidArgument(format!("Date {} is out of range", date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dt(y: i32, m: u32, day: u32) -> NaiveDateTime {
        midnight(d(y, m, day))
    }

    #[test]
    fn test_parse_period_unit() {
        assert_eq!("day".parse::<PeriodUnit>().unwrap(), PeriodUnit::Day);
        assert_eq!("Week".parse::<PeriodUnit>().unwrap(), PeriodUnit::Week);
        assert_eq!(" month ".parse::<PeriodUnit>().unwrap(), PeriodUnit::Month);

        let err = "quarter".parse::<PeriodUnit>().unwrap_err();
        assert!(err.contains("quarter"));
        assert!("".parse::<PeriodUnit>().is_err());
    }

    #[test]
    fn test_day_windows() {
        let w = windows(d(2024, 3, 1), PeriodUnit::Day).unwrap();
        assert_eq!(w.current.start, dt(2024, 3, 1));
        assert_eq!(w.current.end, dt(2024, 3, 2));
        // Leap day
        assert_eq!(w.previous.start, dt(2024, 2, 29));
        assert_eq!(w.previous.end, dt(2024, 3, 1));
    }

    #[test]
    fn test_week_windows_midweek() {
        // 2024-03-06 is a Wednesday
        let w = windows(d(2024, 3, 6), PeriodUnit::Week).unwrap();
        assert_eq!(w.current.start, dt(2024, 3, 4));
        assert_eq!(w.current.end, dt(2024, 3, 11));
        assert_eq!(w.previous.start, dt(2024, 2, 26));
        assert_eq!(w.previous.end, dt(2024, 3, 4));
    }

    #[test]
    fn test_week_windows_sunday_belongs_to_its_own_week() {
        // 2024-03-10 is a Sunday
        let w = windows(d(2024, 3, 10), PeriodUnit::Week).unwrap();
        assert_eq!(w.current.start, dt(2024, 3, 4));
        assert_eq!(w.current.end, dt(2024, 3, 11));
    }

    #[test]
    fn test_week_windows_monday() {
        let w = windows(d(2024, 3, 4), PeriodUnit::Week).unwrap();
        assert_eq!(w.current.start, dt(2024, 3, 4));
    }

    #[test]
    fn test_month_windows_year_rollover() {
        let w = windows(d(2024, 1, 15), PeriodUnit::Month).unwrap();
        assert_eq!(w.current.start, dt(2024, 1, 1));
        assert_eq!(w.current.end, dt(2024, 2, 1));
        assert_eq!(w.previous.start, dt(2023, 12, 1));
        assert_eq!(w.previous.end, dt(2024, 1, 1));
    }

    #[test]
    fn test_month_windows_end_of_month() {
        let w = windows(d(2024, 3, 31), PeriodUnit::Month).unwrap();
        assert_eq!(w.current.start, dt(2024, 3, 1));
        assert_eq!(w.current.end, dt(2024, 4, 1));
        assert_eq!(w.previous.start, dt(2024, 2, 1));

        let w = windows(d(2024, 12, 5), PeriodUnit::Month).unwrap();
        assert_eq!(w.current.end, dt(2025, 1, 1));
    }

    #[test]
    fn test_windows_are_adjacent_and_equal_length() {
        let mut date = d(2023, 1, 1);
        let last = d(2025, 12, 31);

        while date <= last {
            for unit in PeriodUnit::all() {
                let w = windows(date, *unit).unwrap();
                assert_eq!(w.previous.end, w.current.start, "{} {}", date, unit);
                assert!(w.current.contains(midnight(date)), "{} {}", date, unit);

                match unit {
                    PeriodUnit::Day | PeriodUnit::Week => {
                        assert_eq!(
                            w.current.end - w.current.start,
                            w.previous.end - w.previous.start
                        );
                    }
                    PeriodUnit::Month => {
                        for window in [w.current, w.previous] {
                            assert_eq!(window.start.day(), 1);
                            assert_eq!(
                                window.start.date().checked_add_months(Months::new(1)),
                                Some(window.end.date())
                            );
                        }
                    }
                }
            }
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_windows_out_of_range() {
        let err = windows(NaiveDate::MIN, PeriodUnit::Day).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_lookback_window() {
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        let w = Window::lookback(as_of, 30).unwrap();
        assert_eq!(
            w.start,
            NaiveDate::from_ymd_opt(2024, 2, 5)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        );
        assert_eq!(w.end, as_of);
        assert!(!w.contains(as_of));
    }

    #[test]
    fn test_window_display() {
        let w = windows(d(2024, 1, 15), PeriodUnit::Day).unwrap();
        assert_eq!(
            w.current.to_string(),
            "[2024-01-15 00:00:00, 2024-01-16 00:00:00)"
        );
    }
}
