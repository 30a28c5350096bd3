//! Aggregate practice statistics for the director dashboard

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trailing window covered by the dashboard statistics
pub const STATISTICS_WINDOW_DAYS: i64 = 28;

/// One student's scored week, the input to aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentWeek {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub week_start_date: NaiveDate,
    pub total_minutes: i32,
    pub total_points: i32,
    pub signed: bool,
}

/// Per-student totals over the statistics window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentStatistics {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub total_minutes: i64,
    pub average_minutes_per_week: i64,
    pub average_points_per_week: i64,
    pub week_count: i64,
    /// Percentage of weeks signed by a parent
    pub signature_rate: i64,
}

/// Program-wide averages for one week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyStatistics {
    pub week_start_date: NaiveDate,
    pub average_minutes: i64,
    pub average_points: i64,
    pub signature_rate: i64,
    pub student_count: i64,
}

/// `sum / count` rounded half up; 0 when there is nothing to average
pub fn rounded_average(sum: i64, count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    (2 * sum + count).div_euclid(2 * count)
}

/// `part / whole` as a whole percentage, rounded half up
pub fn rounded_percent(part: i64, whole: i64) -> i64 {
    rounded_average(part * 100, whole)
}

#[derive(Default)]
struct Tally {
    minutes: i64,
    points: i64,
    signed: i64,
    weeks: i64,
}

impl Tally {
    fn add(&mut self, week: &StudentWeek) {
        self.minutes += week.total_minutes as i64;
        self.points += week.total_points as i64;
        self.weeks += 1;
        if week.signed {
            self.signed += 1;
        }
    }
}

/// Per-student statistics, ordered by last name then first name
pub fn summarize_students(weeks: &[StudentWeek]) -> Vec<StudentStatistics> {
    let mut tallies: BTreeMap<Uuid, (&StudentWeek, Tally)> = BTreeMap::new();
    for week in weeks {
        tallies
            .entry(week.student_id)
            .or_insert_with(|| (week, Tally::default()))
            .1
            .add(week);
    }

    let mut stats: Vec<StudentStatistics> = tallies
        .into_values()
        .map(|(first, tally)| StudentStatistics {
            student_id: first.student_id,
            first_name: first.first_name.clone(),
            last_name: first.last_name.clone(),
            total_minutes: tally.minutes,
            average_minutes_per_week: rounded_average(tally.minutes, tally.weeks),
            average_points_per_week: rounded_average(tally.points, tally.weeks),
            week_count: tally.weeks,
            signature_rate: rounded_percent(tally.signed, tally.weeks),
        })
        .collect();

    stats.sort_by(|a, b| {
        (&a.last_name, &a.first_name, a.student_id).cmp(&(&b.last_name, &b.first_name, b.student_id))
    });
    stats
}

/// Program-wide statistics per week, newest week first
pub fn summarize_weeks(weeks: &[StudentWeek]) -> Vec<WeeklyStatistics> {
    let mut tallies: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for week in weeks {
        tallies.entry(week.week_start_date).or_default().add(week);
    }

    tallies
        .into_iter()
        .rev()
        .map(|(week_start_date, tally)| WeeklyStatistics {
            week_start_date,
            average_minutes: rounded_average(tally.minutes, tally.weeks),
            average_points: rounded_average(tally.points, tally.weeks),
            signature_rate: rounded_percent(tally.signed, tally.weeks),
            // one record per student per week
            student_count: tally.weeks,
        })
        .collect()
}
