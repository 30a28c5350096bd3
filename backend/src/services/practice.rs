//! Practice record persistence and the approval workflow
//!
//! Records are loaded into [`PracticeRecord`], changed through its state
//! machine, and written back in full. Score columns are a denormalized copy
//! refreshed on every save.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::StudentNameRow;
use crate::services::settings::SettingsService;
use shared::{
    week_start_for, ApprovalState, ApprovalStatus, ParentResponse, PracticeDay, PracticeError,
    PracticeRecord, Signature, SignatureMethod, StudentName, WeeklyMinutes,
};

/// Practice record service
#[derive(Clone)]
pub struct PracticeService {
    db: PgPool,
}

/// Database row for a practice record
#[derive(Debug, sqlx::FromRow)]
pub struct PracticeRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_start_date: NaiveDate,
    pub monday_minutes: i32,
    pub tuesday_minutes: i32,
    pub wednesday_minutes: i32,
    pub thursday_minutes: i32,
    pub friday_minutes: i32,
    pub saturday_minutes: i32,
    pub sunday_minutes: i32,
    pub approval_status: String,
    pub verification_phone: Option<String>,
    pub verification_expiry: Option<DateTime<Utc>>,
    pub signature_method: Option<String>,
    pub parent_signature_id: Option<Uuid>,
    pub signature_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PracticeRow> for PracticeRecord {
    type Error = AppError;

    fn try_from(row: PracticeRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str| AppError::Internal(format!("Practice record {} has {}", row.id, what));

        let status = row
            .approval_status
            .parse::<ApprovalStatus>()
            .map_err(|e| corrupt(&e))?;

        let approval = match status {
            ApprovalStatus::Unsigned => ApprovalState::Unsigned,
            ApprovalStatus::Pending => ApprovalState::Pending {
                phone: row
                    .verification_phone
                    .clone()
                    .ok_or_else(|| corrupt("no verification phone"))?,
                expires_at: row
                    .verification_expiry
                    .ok_or_else(|| corrupt("no verification expiry"))?,
            },
            ApprovalStatus::Signed => ApprovalState::Signed(Signature {
                method: row
                    .signature_method
                    .as_deref()
                    .ok_or_else(|| corrupt("no signature method"))?
                    .parse::<SignatureMethod>()
                    .map_err(|e| corrupt(&e))?,
                parent_id: row.parent_signature_id,
                signed_on: row
                    .signature_date
                    .ok_or_else(|| corrupt("no signature date"))?,
            }),
        };

        Ok(PracticeRecord {
            id: row.id,
            student_id: row.student_id,
            week_start_date: row.week_start_date,
            minutes: WeeklyMinutes {
                monday_minutes: row.monday_minutes,
                tuesday_minutes: row.tuesday_minutes,
                wednesday_minutes: row.wednesday_minutes,
                thursday_minutes: row.thursday_minutes,
                friday_minutes: row.friday_minutes,
                saturday_minutes: row.saturday_minutes,
                sunday_minutes: row.sunday_minutes,
            },
            approval,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Approval state flattened onto its table columns
#[derive(Debug, Default, PartialEq)]
struct ApprovalColumns {
    status: &'static str,
    phone: Option<String>,
    expiry: Option<DateTime<Utc>>,
    method: Option<&'static str>,
    parent_id: Option<Uuid>,
    date: Option<NaiveDate>,
}

impl From<&ApprovalState> for ApprovalColumns {
    fn from(state: &ApprovalState) -> Self {
        let status = state.status().as_str();
        match state {
            ApprovalState::Unsigned => ApprovalColumns {
                status,
                ..Default::default()
            },
            ApprovalState::Pending { phone, expires_at } => ApprovalColumns {
                status,
                phone: Some(phone.clone()),
                expiry: Some(*expires_at),
                ..Default::default()
            },
            ApprovalState::Signed(signature) => ApprovalColumns {
                status,
                method: Some(signature.method.as_str()),
                parent_id: signature.parent_id,
                date: Some(signature.signed_on),
                ..Default::default()
            },
        }
    }
}

pub const PRACTICE_COLUMNS: &str = r#"
    id, student_id, week_start_date,
    monday_minutes, tuesday_minutes, wednesday_minutes, thursday_minutes,
    friday_minutes, saturday_minutes, sunday_minutes,
    approval_status, verification_phone, verification_expiry,
    signature_method, parent_signature_id, signature_date,
    created_at, updated_at
"#;

/// Outcome of fetching the current week's record
#[derive(Debug)]
pub struct CurrentWeek {
    pub record: PracticeRecord,
    pub created: bool,
}

/// Outcome of an inbound SMS reply
#[derive(Debug)]
pub struct SmsReplyOutcome {
    pub response: ParentResponse,
    pub record: PracticeRecord,
}

impl PracticeService {
    /// Create a new PracticeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Find or create the student's record for the week containing `today`
    pub async fn current_week(&self, student_id: Uuid, today: NaiveDate) -> AppResult<CurrentWeek> {
        let settings = SettingsService::new(self.db.clone()).get().await?;
        let week_start = week_start_for(today, settings.week_start_day);

        let fresh = PracticeRecord::new(Uuid::new_v4(), student_id, week_start, Utc::now());
        let mut conn = self.db.acquire().await?;
        if Self::insert(&mut conn, &fresh).await? {
            tracing::info!(
                record_id = %fresh.id,
                student_id = %student_id,
                week_start = %week_start,
                "Practice record created"
            );
            return Ok(CurrentWeek {
                record: fresh,
                created: true,
            });
        }

        let row = sqlx::query_as::<_, PracticeRow>(&format!(
            "SELECT {} FROM practice_records WHERE student_id = $1 AND week_start_date = $2",
            PRACTICE_COLUMNS
        ))
        .bind(student_id)
        .bind(week_start)
        .fetch_one(&mut *conn)
        .await?;

        Ok(CurrentWeek {
            record: PracticeRecord::try_from(row)?,
            created: false,
        })
    }

    /// All of a student's records, newest week first
    pub async fn list_for_student(&self, student_id: Uuid) -> AppResult<Vec<PracticeRecord>> {
        let rows = sqlx::query_as::<_, PracticeRow>(&format!(
            "SELECT {} FROM practice_records WHERE student_id = $1 ORDER BY week_start_date DESC",
            PRACTICE_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(PracticeRecord::try_from).collect()
    }

    /// One record, only if it belongs to `student_id`
    pub async fn get_for_student(
        &self,
        student_id: Uuid,
        record_id: Uuid,
    ) -> AppResult<PracticeRecord> {
        let row = sqlx::query_as::<_, PracticeRow>(&format!(
            "SELECT {} FROM practice_records WHERE id = $1 AND student_id = $2",
            PRACTICE_COLUMNS
        ))
        .bind(record_id)
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Practice record".to_string()))?;

        PracticeRecord::try_from(row)
    }

    /// Set one day's minutes
    pub async fn update_minutes(
        &self,
        student_id: Uuid,
        record_id: Uuid,
        day: PracticeDay,
        minutes: i32,
    ) -> AppResult<PracticeRecord> {
        let ((), record) = self
            .mutate(student_id, record_id, |record| record.set_minutes(day, minutes))
            .await?;

        tracing::info!(
            record_id = %record.id,
            day = %day,
            minutes,
            total_minutes = record.minutes.total(),
            "Practice minutes updated"
        );
        Ok(record)
    }

    /// Put the record into the pending state for a text to `phone`.
    ///
    /// Returns the record together with the message to send.
    pub async fn request_approval(
        &self,
        student_id: Uuid,
        record_id: Uuid,
        phone: &str,
        ttl: Duration,
    ) -> AppResult<(PracticeRecord, String)> {
        let student = self.student_name(student_id).await?;
        let now = Utc::now();
        let ((), record) = self
            .mutate(student_id, record_id, |record| record.request_approval(phone, now, ttl))
            .await?;

        tracing::info!(record_id = %record.id, "Parent approval requested");
        let message =
            record.approval_message(&format!("{} {}", student.first_name, student.last_name));
        Ok((record, message))
    }

    /// Resolve a pending request with the parent's reply, relayed by the student
    pub async fn verify(
        &self,
        student_id: Uuid,
        record_id: Uuid,
        reply: &str,
    ) -> AppResult<(ParentResponse, PracticeRecord)> {
        let response = ParentResponse::parse(reply);
        let now = Utc::now();
        let (response, record) = self
            .mutate(student_id, record_id, |record| record.respond(response, now, None))
            .await?;

        tracing::info!(record_id = %record.id, ?response, "Parent approval resolved");
        Ok((response, record))
    }

    /// In-app signature by a linked parent
    pub async fn sign(
        &self,
        parent_id: Uuid,
        student_id: Uuid,
        record_id: Uuid,
    ) -> AppResult<PracticeRecord> {
        let today = Utc::now().date_naive();
        let ((), record) = self
            .mutate(student_id, record_id, |record| record.sign(parent_id, today))
            .await?;

        tracing::info!(record_id = %record.id, parent_id = %parent_id, "Practice record signed");
        Ok(record)
    }

    /// Resolve the newest pending request sent to `from` with an inbound reply.
    ///
    /// Returns `None` when nothing is waiting on that number.
    pub async fn resolve_sms_reply(
        &self,
        from: &str,
        body: &str,
    ) -> AppResult<Option<SmsReplyOutcome>> {
        let phone = shared::canonical_phone_number(from);
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, PracticeRow>(&format!(
            r#"
            SELECT {} FROM practice_records
            WHERE approval_status = 'pending' AND verification_phone = $1
            ORDER BY updated_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
            PRACTICE_COLUMNS
        ))
        .bind(&phone)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = PracticeRecord::try_from(row)?;

        let parent_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT u.id FROM users u
            JOIN student_parents sp ON sp.parent_id = u.id
            WHERE sp.student_id = $1 AND u.phone_number = $2
            LIMIT 1
            "#,
        )
        .bind(record.student_id)
        .bind(&phone)
        .fetch_optional(&mut *tx)
        .await?;

        let now = Utc::now();
        let response = record.respond(ParentResponse::parse(body), now, parent_id)?;
        record.updated_at = now;
        Self::save(&mut tx, &record).await?;
        tx.commit().await?;

        tracing::info!(record_id = %record.id, ?response, "Parent approval resolved by text reply");
        Ok(Some(SmsReplyOutcome { response, record }))
    }

    pub async fn student_name(&self, student_id: Uuid) -> AppResult<StudentName> {
        let row = sqlx::query_as::<_, StudentNameRow>(
            "SELECT id, first_name, last_name FROM users WHERE id = $1 AND role = 'student'",
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Student".to_string()))?;

        Ok(row.into())
    }

    /// Lock a record, apply `change`, and persist the result.
    ///
    /// A failed change rolls back without touching the row.
    async fn mutate<T, F>(
        &self,
        student_id: Uuid,
        record_id: Uuid,
        change: F,
    ) -> AppResult<(T, PracticeRecord)>
    where
        F: FnOnce(&mut PracticeRecord) -> Result<T, PracticeError>,
    {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, PracticeRow>(&format!(
            "SELECT {} FROM practice_records WHERE id = $1 AND student_id = $2 FOR UPDATE",
            PRACTICE_COLUMNS
        ))
        .bind(record_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Practice record".to_string()))?;

        let mut record = PracticeRecord::try_from(row)?;
        let output = change(&mut record)?;
        record.updated_at = Utc::now();

        Self::save(&mut tx, &record).await?;
        tx.commit().await?;

        Ok((output, record))
    }

    /// Insert a new record unless one already exists for its week
    async fn insert(conn: &mut PgConnection, record: &PracticeRecord) -> AppResult<bool> {
        let score = record.score();
        let approval = ApprovalColumns::from(&record.approval);
        let minutes = &record.minutes;

        let inserted = sqlx::query(
            r#"
            INSERT INTO practice_records (
                id, student_id, week_start_date,
                monday_minutes, tuesday_minutes, wednesday_minutes, thursday_minutes,
                friday_minutes, saturday_minutes, sunday_minutes,
                total_minutes, days_with_practice, base_points, bonus_points,
                parent_signature_points, total_points,
                approval_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (student_id, week_start_date) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(record.student_id)
        .bind(record.week_start_date)
        .bind(minutes.monday_minutes)
        .bind(minutes.tuesday_minutes)
        .bind(minutes.wednesday_minutes)
        .bind(minutes.thursday_minutes)
        .bind(minutes.friday_minutes)
        .bind(minutes.saturday_minutes)
        .bind(minutes.sunday_minutes)
        .bind(score.total_minutes)
        .bind(score.days_with_practice)
        .bind(score.base_points)
        .bind(score.bonus_points)
        .bind(score.parent_signature_points)
        .bind(score.total_points)
        .bind(approval.status)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(inserted.rows_affected() == 1)
    }

    /// Write every mutable column of `record`
    async fn save(conn: &mut PgConnection, record: &PracticeRecord) -> AppResult<()> {
        let score = record.score();
        let approval = ApprovalColumns::from(&record.approval);
        let minutes = &record.minutes;

        sqlx::query(
            r#"
            UPDATE practice_records SET
                monday_minutes = $2, tuesday_minutes = $3, wednesday_minutes = $4,
                thursday_minutes = $5, friday_minutes = $6, saturday_minutes = $7,
                sunday_minutes = $8,
                total_minutes = $9, days_with_practice = $10, base_points = $11,
                bonus_points = $12, parent_signature_points = $13, total_points = $14,
                approval_status = $15, verification_phone = $16, verification_expiry = $17,
                signature_method = $18, parent_signature_id = $19, signature_date = $20,
                updated_at = $21
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(minutes.monday_minutes)
        .bind(minutes.tuesday_minutes)
        .bind(minutes.wednesday_minutes)
        .bind(minutes.thursday_minutes)
        .bind(minutes.friday_minutes)
        .bind(minutes.saturday_minutes)
        .bind(minutes.sunday_minutes)
        .bind(score.total_minutes)
        .bind(score.days_with_practice)
        .bind(score.base_points)
        .bind(score.bonus_points)
        .bind(score.parent_signature_points)
        .bind(score.total_points)
        .bind(approval.status)
        .bind(approval.phone)
        .bind(approval.expiry)
        .bind(approval.method)
        .bind(approval.parent_id)
        .bind(approval.date)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
