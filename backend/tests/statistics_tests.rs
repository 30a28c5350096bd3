//! Director statistics tests
//!
//! Aggregation of scored weeks into per-student and per-week summaries.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use shared::{
    rounded_average, rounded_percent, summarize_students, summarize_weeks, DateRange, StudentWeek,
    STATISTICS_WINDOW_DAYS,
};
use uuid::Uuid;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn week(
    student_id: Uuid,
    name: (&str, &str),
    start: &str,
    minutes: i32,
    points: i32,
    signed: bool,
) -> StudentWeek {
    StudentWeek {
        student_id,
        first_name: name.0.to_string(),
        last_name: name.1.to_string(),
        week_start_date: date(start),
        total_minutes: minutes,
        total_points: points,
        signed,
    }
}

// ============================================================================
// Per-student Summaries
// ============================================================================

#[test]
fn test_student_summary_averages() {
    let ada = Uuid::new_v4();
    let weeks = vec![
        week(ada, ("Ada", "Lovelace"), "2024-03-04", 100, 100, true),
        week(ada, ("Ada", "Lovelace"), "2024-03-11", 45, 50, false),
        week(ada, ("Ada", "Lovelace"), "2024-03-18", 30, 45, true),
    ];

    let stats = summarize_students(&weeks);
    assert_eq!(stats.len(), 1);

    let ada_stats = &stats[0];
    assert_eq!(ada_stats.total_minutes, 175);
    assert_eq!(ada_stats.week_count, 3);
    assert_eq!(ada_stats.average_minutes_per_week, 58); // 58.33
    assert_eq!(ada_stats.average_points_per_week, 65);
    assert_eq!(ada_stats.signature_rate, 67);
}

#[test]
fn test_students_sorted_by_last_then_first_name() {
    let weeks = vec![
        week(Uuid::new_v4(), ("Grace", "Hopper"), "2024-03-11", 10, 35, false),
        week(Uuid::new_v4(), ("Ada", "Lovelace"), "2024-03-11", 10, 35, false),
        week(Uuid::new_v4(), ("Alan", "Hopper"), "2024-03-11", 10, 35, false),
    ];

    let names: Vec<_> = summarize_students(&weeks)
        .into_iter()
        .map(|s| format!("{} {}", s.first_name, s.last_name))
        .collect();
    assert_eq!(names, ["Alan Hopper", "Grace Hopper", "Ada Lovelace"]);
}

// ============================================================================
// Per-week Summaries
// ============================================================================

#[test]
fn test_weeks_newest_first() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let weeks = vec![
        week(a, ("A", "A"), "2024-03-04", 60, 60, false),
        week(a, ("A", "A"), "2024-03-18", 20, 40, true),
        week(b, ("B", "B"), "2024-03-18", 31, 45, false),
        week(b, ("B", "B"), "2024-03-11", 0, 35, false),
    ];

    let stats = summarize_weeks(&weeks);
    let starts: Vec<_> = stats.iter().map(|s| s.week_start_date).collect();
    assert_eq!(
        starts,
        [date("2024-03-18"), date("2024-03-11"), date("2024-03-04")]
    );

    let newest = &stats[0];
    assert_eq!(newest.student_count, 2);
    assert_eq!(newest.average_minutes, 26); // 25.5 rounds up
    assert_eq!(newest.average_points, 43); // 42.5 rounds up
    assert_eq!(newest.signature_rate, 50);
}

#[test]
fn test_statistics_window() {
    let range = DateRange::trailing_days(date("2024-04-01"), STATISTICS_WINDOW_DAYS);
    assert_eq!(range.start, date("2024-03-04"));
    assert!(range.contains(date("2024-03-04")));
    assert!(!range.contains(date("2024-03-03")));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Rounded averages stay within half a unit of the true average
    #[test]
    fn property_rounded_average_close(sum in 0i64..100_000, count in 1i64..500) {
        let avg = rounded_average(sum, count);
        let exact = sum as f64 / count as f64;
        prop_assert!((avg as f64 - exact).abs() <= 0.5);
    }

    /// Percentages are always between 0 and 100
    #[test]
    fn property_percent_in_range(whole in 1i64..1000, frac in 0.0f64..=1.0) {
        let part = ((whole as f64) * frac).floor() as i64;
        let pct = rounded_percent(part, whole);
        prop_assert!((0..=100).contains(&pct));
    }

    /// Week summaries account for every input record
    #[test]
    fn property_week_counts_cover_input(offsets in prop::collection::vec(0i64..6, 1..40)) {
        let base = date("2024-01-01");
        let weeks: Vec<_> = offsets
            .iter()
            .map(|o| StudentWeek {
                student_id: Uuid::new_v4(),
                first_name: "S".into(),
                last_name: "T".into(),
                week_start_date: base + Duration::weeks(*o),
                total_minutes: 30,
                total_points: 45,
                signed: false,
            })
            .collect();

        let summaries = summarize_weeks(&weeks);
        let counted: i64 = summaries.iter().map(|s| s.student_count).sum();
        prop_assert_eq!(counted, weeks.len() as i64);
        prop_assert!(summaries.windows(2).all(|w| w[0].week_start_date > w[1].week_start_date));
    }
}
