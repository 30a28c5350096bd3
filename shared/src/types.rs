//! Common types used across the platform

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days`-long window ending on `end` (inclusive)
    pub fn trailing_days(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Start of the week containing `date`.
///
/// `week_start_day` uses 0 = Sunday through 6 = Saturday. Values outside that
/// range are wrapped.
pub fn week_start_for(date: NaiveDate, week_start_day: i16) -> NaiveDate {
    let today = date.weekday().num_days_from_sunday() as i64;
    let start = (week_start_day as i64).rem_euclid(7);
    let back = (today - start).rem_euclid(7);
    date - Duration::days(back)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_week_start_monday() {
        // 2024-03-13 is a Wednesday
        assert_eq!(week_start_for(date("2024-03-13"), 1), date("2024-03-11"));
        assert_eq!(week_start_for(date("2024-03-11"), 1), date("2024-03-11"));
        // Sunday belongs to the week that started the previous Monday
        assert_eq!(week_start_for(date("2024-03-17"), 1), date("2024-03-11"));
    }

    #[test]
    fn test_week_start_sunday() {
        assert_eq!(week_start_for(date("2024-03-13"), 0), date("2024-03-10"));
        assert_eq!(week_start_for(date("2024-03-17"), 0), date("2024-03-17"));
    }

    #[test]
    fn test_week_start_saturday() {
        assert_eq!(week_start_for(date("2024-03-15"), 6), date("2024-03-09"));
        assert_eq!(week_start_for(date("2024-03-16"), 6), date("2024-03-16"));
    }

    #[test]
    fn test_trailing_days() {
        let range = DateRange::trailing_days(date("2024-03-29"), 28);
        assert_eq!(range.start, date("2024-03-01"));
        assert!(range.contains(date("2024-03-01")));
        assert!(range.contains(date("2024-03-29")));
        assert!(!range.contains(date("2024-02-29")));
    }
}
