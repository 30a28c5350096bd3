//! Director views: rosters, weekly records, statistics, and exports

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::UserSummaryRow;
use crate::services::practice::PracticeRow;
use shared::{
    summarize_students, summarize_weeks, DateRange, PracticeRecord, PracticeRecordView,
    StudentName, StudentStatistics, StudentWeek, UserRole, UserSummary, WeeklyStatistics,
    STATISTICS_WINDOW_DAYS,
};

#[derive(Clone)]
pub struct DirectorService {
    db: PgPool,
}

/// A practice record with the student it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct RecordWithStudent {
    #[serde(flatten)]
    pub record: PracticeRecordView,
    pub student: StudentName,
}

/// One flat CSV line of the weekly export
#[derive(Debug, Serialize)]
pub struct WeeklyRecordCsvRow {
    pub last_name: String,
    pub first_name: String,
    pub week_start_date: NaiveDate,
    pub monday: i32,
    pub tuesday: i32,
    pub wednesday: i32,
    pub thursday: i32,
    pub friday: i32,
    pub saturday: i32,
    pub sunday: i32,
    pub total_minutes: i32,
    pub days_with_practice: i32,
    pub total_points: i32,
    pub status: &'static str,
    pub signature_date: Option<NaiveDate>,
}

impl From<&RecordWithStudent> for WeeklyRecordCsvRow {
    fn from(row: &RecordWithStudent) -> Self {
        let r = &row.record;
        WeeklyRecordCsvRow {
            last_name: row.student.last_name.clone(),
            first_name: row.student.first_name.clone(),
            week_start_date: r.week_start_date,
            monday: r.minutes.monday_minutes,
            tuesday: r.minutes.tuesday_minutes,
            wednesday: r.minutes.wednesday_minutes,
            thursday: r.minutes.thursday_minutes,
            friday: r.minutes.friday_minutes,
            saturday: r.minutes.saturday_minutes,
            sunday: r.minutes.sunday_minutes,
            total_minutes: r.score.total_minutes,
            days_with_practice: r.score.days_with_practice,
            total_points: r.score.total_points,
            status: r.status.as_str(),
            signature_date: r.signature_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecordWithStudentRow {
    #[sqlx(flatten)]
    record: PracticeRow,
    first_name: String,
    last_name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StudentWeekRow {
    student_id: Uuid,
    first_name: String,
    last_name: String,
    week_start_date: NaiveDate,
    total_minutes: i32,
    total_points: i32,
    signed: bool,
}

impl From<StudentWeekRow> for StudentWeek {
    fn from(row: StudentWeekRow) -> Self {
        StudentWeek {
            student_id: row.student_id,
            first_name: row.first_name,
            last_name: row.last_name,
            week_start_date: row.week_start_date,
            total_minutes: row.total_minutes,
            total_points: row.total_points,
            signed: row.signed,
        }
    }
}

impl DirectorService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_students(&self) -> AppResult<Vec<UserSummary>> {
        self.list_role(UserRole::Student).await
    }

    pub async fn list_parents(&self) -> AppResult<Vec<UserSummary>> {
        self.list_role(UserRole::Parent).await
    }

    async fn list_role(&self, role: UserRole) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT id, username, first_name, last_name, email
            FROM users
            WHERE role = $1
            ORDER BY last_name, first_name
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    /// Every student's record for one week
    pub async fn records_for_week(&self, week_start: NaiveDate) -> AppResult<Vec<RecordWithStudent>> {
        let rows = sqlx::query_as::<_, RecordWithStudentRow>(
            r#"
            SELECT pr.*, u.first_name, u.last_name
            FROM practice_records pr
            JOIN users u ON u.id = pr.student_id
            WHERE pr.week_start_date = $1
            ORDER BY u.last_name, u.first_name
            "#,
        )
        .bind(week_start)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let student = StudentName {
                    id: row.record.student_id,
                    first_name: row.first_name,
                    last_name: row.last_name,
                };
                let record = PracticeRecord::try_from(row.record)?;
                Ok(RecordWithStudent {
                    record: record.view(),
                    student,
                })
            })
            .collect()
    }

    /// A student and all of their records, newest week first
    pub async fn student_records(
        &self,
        student_id: Uuid,
    ) -> AppResult<(UserSummary, Vec<PracticeRecord>)> {
        let student = sqlx::query_as::<_, UserSummaryRow>(
            r#"
            SELECT id, username, first_name, last_name, email
            FROM users
            WHERE id = $1 AND role = 'student'
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Student".to_string()))?;

        let rows = sqlx::query_as::<_, PracticeRow>(
            r#"
            SELECT * FROM practice_records
            WHERE student_id = $1
            ORDER BY week_start_date DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        let records = rows
            .into_iter()
            .map(PracticeRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((student.into(), records))
    }

    /// Per-student statistics over the trailing window ending `today`
    pub async fn statistics(&self, today: NaiveDate) -> AppResult<(Vec<StudentStatistics>, DateRange)> {
        let period = DateRange::trailing_days(today, STATISTICS_WINDOW_DAYS);
        let weeks = self.student_weeks(&period).await?;
        Ok((summarize_students(&weeks), period))
    }

    /// Program-wide per-week statistics over the trailing window ending `today`
    pub async fn weekly_statistics(
        &self,
        today: NaiveDate,
    ) -> AppResult<(Vec<WeeklyStatistics>, DateRange)> {
        let period = DateRange::trailing_days(today, STATISTICS_WINDOW_DAYS);
        let weeks = self.student_weeks(&period).await?;
        Ok((summarize_weeks(&weeks), period))
    }

    async fn student_weeks(&self, period: &DateRange) -> AppResult<Vec<StudentWeek>> {
        let rows = sqlx::query_as::<_, StudentWeekRow>(
            r#"
            SELECT pr.student_id, u.first_name, u.last_name, pr.week_start_date,
                   pr.total_minutes, pr.total_points,
                   pr.approval_status = 'signed' AS signed
            FROM practice_records pr
            JOIN users u ON u.id = pr.student_id
            WHERE pr.week_start_date BETWEEN $1 AND $2
            "#,
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StudentWeek::from).collect())
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

/// Parse a `YYYY-MM-DD` path segment
pub fn parse_week_start(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError("Invalid date format. Use YYYY-MM-DD".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::PracticeDay;

    fn record_with_student() -> RecordWithStudent {
        let now = Utc::now();
        let mut record = PracticeRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2024-03-11".parse().unwrap(),
            now,
        );
        record.set_minutes(PracticeDay::Monday, 40).unwrap();
        record.set_minutes(PracticeDay::Friday, 25).unwrap();
        RecordWithStudent {
            student: StudentName {
                id: record.student_id,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
            },
            record: record.view(),
        }
    }

    #[test]
    fn test_parse_week_start() {
        assert_eq!(
            parse_week_start("2024-03-11").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
        assert!(parse_week_start("03/11/2024").is_err());
        assert!(parse_week_start("2024-02-30").is_err());
    }

    #[test]
    fn test_csv_export() {
        let rows = vec![WeeklyRecordCsvRow::from(&record_with_student())];
        let csv = DirectorService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("last_name,first_name,week_start_date,monday"));
        let line = lines.next().unwrap();
        assert!(line.starts_with("Lovelace,Ada,2024-03-11,40,0,0,0,25,0,0,65,2,60,unsigned"));
    }

    #[test]
    fn test_record_with_student_json_is_flat() {
        let json = serde_json::to_value(record_with_student()).unwrap();
        assert_eq!(json["monday_minutes"], 40);
        assert_eq!(json["total_points"], 60);
        assert_eq!(json["student"]["last_name"], "Lovelace");
    }
}
