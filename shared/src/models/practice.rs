//! Weekly practice records, scoring, and the parent approval state machine

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{
    canonical_phone_number, validate_daily_minutes, validate_phone_number, MAX_DAILY_MINUTES,
};

// ============================================================================
// Scoring Constants
// ============================================================================

/// Minimum-minutes thresholds and the base points they earn, highest first.
pub const BASE_POINT_TIERS: [(i32, i32); 9] = [
    (100, 80),
    (90, 75),
    (80, 70),
    (70, 65),
    (60, 60),
    (50, 55),
    (40, 50),
    (30, 45),
    (20, 40),
];

/// Base points for a week under the lowest tier (0-19 minutes)
pub const MIN_BASE_POINTS: i32 = 35;

/// Days of practice needed for the consistency bonus
pub const BONUS_MIN_DAYS: i32 = 5;

pub const BONUS_POINTS: i32 = 5;

pub const PARENT_SIGNATURE_POINTS: i32 = 20;

/// Highest total a single week can score
pub const MAX_WEEKLY_POINTS: i32 = 80 + BONUS_POINTS + PARENT_SIGNATURE_POINTS;

/// Default lifetime of an SMS approval request
pub const DEFAULT_APPROVAL_TTL_HOURS: i64 = 24;

// ============================================================================
// Errors
// ============================================================================

/// Rejected practice record operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PracticeError {
    #[error("Invalid day: {0}")]
    InvalidDay(String),

    #[error("Minutes must be a whole number between 0 and {max}")]
    InvalidMinutes { max: i32 },

    #[error("Invalid phone number format")]
    InvalidPhone,

    #[error("Practice record has already been signed")]
    AlreadySigned,

    #[error("Pending practice record not found")]
    NoPendingApproval,

    #[error("Approval request has expired")]
    ApprovalExpired,
}

// ============================================================================
// Days and Minutes
// ============================================================================

/// Day of a practice week
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PracticeDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl PracticeDay {
    pub const ALL: [PracticeDay; 7] = [
        PracticeDay::Monday,
        PracticeDay::Tuesday,
        PracticeDay::Wednesday,
        PracticeDay::Thursday,
        PracticeDay::Friday,
        PracticeDay::Saturday,
        PracticeDay::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeDay::Monday => "monday",
            PracticeDay::Tuesday => "tuesday",
            PracticeDay::Wednesday => "wednesday",
            PracticeDay::Thursday => "thursday",
            PracticeDay::Friday => "friday",
            PracticeDay::Saturday => "saturday",
            PracticeDay::Sunday => "sunday",
        }
    }

    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => PracticeDay::Monday,
            chrono::Weekday::Tue => PracticeDay::Tuesday,
            chrono::Weekday::Wed => PracticeDay::Wednesday,
            chrono::Weekday::Thu => PracticeDay::Thursday,
            chrono::Weekday::Fri => PracticeDay::Friday,
            chrono::Weekday::Sat => PracticeDay::Saturday,
            chrono::Weekday::Sun => PracticeDay::Sunday,
        }
    }
}

impl std::str::FromStr for PracticeDay {
    type Err = PracticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PracticeDay::ALL
            .into_iter()
            .find(|day| day.as_str() == wanted)
            .ok_or_else(|| PracticeError::InvalidDay(s.to_string()))
    }
}

impl std::fmt::Display for PracticeDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minutes practiced on each day of one week. Days left out of a JSON
/// payload count as zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeeklyMinutes {
    pub monday_minutes: i32,
    pub tuesday_minutes: i32,
    pub wednesday_minutes: i32,
    pub thursday_minutes: i32,
    pub friday_minutes: i32,
    pub saturday_minutes: i32,
    pub sunday_minutes: i32,
}

impl WeeklyMinutes {
    pub fn get(&self, day: PracticeDay) -> i32 {
        match day {
            PracticeDay::Monday => self.monday_minutes,
            PracticeDay::Tuesday => self.tuesday_minutes,
            PracticeDay::Wednesday => self.wednesday_minutes,
            PracticeDay::Thursday => self.thursday_minutes,
            PracticeDay::Friday => self.friday_minutes,
            PracticeDay::Saturday => self.saturday_minutes,
            PracticeDay::Sunday => self.sunday_minutes,
        }
    }

    pub fn set(&mut self, day: PracticeDay, minutes: i32) {
        let slot = match day {
            PracticeDay::Monday => &mut self.monday_minutes,
            PracticeDay::Tuesday => &mut self.tuesday_minutes,
            PracticeDay::Wednesday => &mut self.wednesday_minutes,
            PracticeDay::Thursday => &mut self.thursday_minutes,
            PracticeDay::Friday => &mut self.friday_minutes,
            PracticeDay::Saturday => &mut self.saturday_minutes,
            PracticeDay::Sunday => &mut self.sunday_minutes,
        };
        *slot = minutes;
    }

    pub fn total(&self) -> i32 {
        PracticeDay::ALL.iter().map(|day| self.get(*day)).sum()
    }

    pub fn days_with_practice(&self) -> i32 {
        PracticeDay::ALL
            .iter()
            .filter(|day| self.get(**day) > 0)
            .count() as i32
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Points earned by one week of practice
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PracticeScore {
    pub total_minutes: i32,
    pub days_with_practice: i32,
    pub base_points: i32,
    pub bonus_points: i32,
    pub parent_signature_points: i32,
    pub total_points: i32,
}

/// Base points for a weekly minute total
pub fn base_points(total_minutes: i32) -> i32 {
    BASE_POINT_TIERS
        .iter()
        .find(|(threshold, _)| total_minutes >= *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(MIN_BASE_POINTS)
}

/// Consistency bonus for the number of days practiced
pub fn bonus_points(days_with_practice: i32) -> i32 {
    if days_with_practice >= BONUS_MIN_DAYS {
        BONUS_POINTS
    } else {
        0
    }
}

pub fn signature_points(signed: bool) -> i32 {
    if signed {
        PARENT_SIGNATURE_POINTS
    } else {
        0
    }
}

/// Score a week of practice
pub fn score_week(minutes: &WeeklyMinutes, signed: bool) -> PracticeScore {
    let total_minutes = minutes.total();
    let days_with_practice = minutes.days_with_practice();
    let base_points = base_points(total_minutes);
    let bonus_points = bonus_points(days_with_practice);
    let parent_signature_points = signature_points(signed);

    PracticeScore {
        total_minutes,
        days_with_practice,
        base_points,
        bonus_points,
        parent_signature_points,
        total_points: base_points + bonus_points + parent_signature_points,
    }
}

// ============================================================================
// Approval State Machine
// ============================================================================

/// How a record was signed off
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMethod {
    /// Signed in-app by a linked parent account
    Parent,
    /// Approved by a text message reply
    Sms,
}

impl SignatureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::Parent => "parent",
            SignatureMethod::Sms => "sms",
        }
    }
}

impl std::str::FromStr for SignatureMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(SignatureMethod::Parent),
            "sms" => Ok(SignatureMethod::Sms),
            other => Err(format!("Unknown signature method: {}", other)),
        }
    }
}

/// A parent's sign-off on a week
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub method: SignatureMethod,
    /// Signing parent, when the approval can be tied to an account
    pub parent_id: Option<Uuid>,
    pub signed_on: NaiveDate,
}

/// Where a record is in the approval flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalState {
    Unsigned,
    Pending {
        phone: String,
        expires_at: DateTime<Utc>,
    },
    Signed(Signature),
}

impl ApprovalState {
    pub fn status(&self) -> ApprovalStatus {
        match self {
            ApprovalState::Unsigned => ApprovalStatus::Unsigned,
            ApprovalState::Pending { .. } => ApprovalStatus::Pending,
            ApprovalState::Signed(_) => ApprovalStatus::Signed,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            ApprovalState::Signed(signature) => Some(signature),
            _ => None,
        }
    }
}

/// Flat status tag of an [`ApprovalState`], as stored and serialized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Unsigned,
    Pending,
    Signed,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Unsigned => "unsigned",
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Signed => "signed",
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unsigned" => Ok(ApprovalStatus::Unsigned),
            "pending" => Ok(ApprovalStatus::Pending),
            "signed" => Ok(ApprovalStatus::Signed),
            other => Err(format!("Unknown approval status: {}", other)),
        }
    }
}

/// A parent's answer to an approval request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentResponse {
    Approve,
    Deny,
}

impl ParentResponse {
    /// `Y` or `YES` (any case, surrounding whitespace ignored) approves;
    /// any other reply denies.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" => ParentResponse::Approve,
            _ => ParentResponse::Deny,
        }
    }

    pub fn outcome_message(&self) -> &'static str {
        match self {
            ParentResponse::Approve => "Practice record approved successfully",
            ParentResponse::Deny => "Practice record was not approved",
        }
    }
}

// ============================================================================
// Practice Record
// ============================================================================

/// One student's practice for one week
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_start_date: NaiveDate,
    pub minutes: WeeklyMinutes,
    pub approval: ApprovalState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PracticeRecord {
    /// An empty, unsigned week
    pub fn new(id: Uuid, student_id: Uuid, week_start_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            student_id,
            week_start_date,
            minutes: WeeklyMinutes::default(),
            approval: ApprovalState::Unsigned,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn score(&self) -> PracticeScore {
        score_week(&self.minutes, self.is_signed())
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.approval, ApprovalState::Signed(_))
    }

    /// Record minutes for one day.
    ///
    /// A pending approval request is withdrawn since it quoted the old total.
    pub fn set_minutes(&mut self, day: PracticeDay, minutes: i32) -> Result<(), PracticeError> {
        validate_daily_minutes(minutes).map_err(|_| PracticeError::InvalidMinutes {
            max: MAX_DAILY_MINUTES,
        })?;
        if self.is_signed() {
            return Err(PracticeError::AlreadySigned);
        }

        self.minutes.set(day, minutes);
        if matches!(self.approval, ApprovalState::Pending { .. }) {
            self.approval = ApprovalState::Unsigned;
        }
        Ok(())
    }

    /// Open (or re-open) a text-message approval request to `phone`
    pub fn request_approval(
        &mut self,
        phone: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), PracticeError> {
        validate_phone_number(phone).map_err(|_| PracticeError::InvalidPhone)?;
        if self.is_signed() {
            return Err(PracticeError::AlreadySigned);
        }

        self.approval = ApprovalState::Pending {
            phone: canonical_phone_number(phone),
            expires_at: now + ttl,
        };
        Ok(())
    }

    /// Resolve a pending approval request.
    ///
    /// An expired request is left pending so the student can re-send it.
    pub fn respond(
        &mut self,
        response: ParentResponse,
        now: DateTime<Utc>,
        parent_id: Option<Uuid>,
    ) -> Result<ParentResponse, PracticeError> {
        let expires_at = match &self.approval {
            ApprovalState::Pending { expires_at, .. } => *expires_at,
            _ => return Err(PracticeError::NoPendingApproval),
        };

        if now > expires_at {
            return Err(PracticeError::ApprovalExpired);
        }

        self.approval = match response {
            ParentResponse::Approve => ApprovalState::Signed(Signature {
                method: SignatureMethod::Sms,
                parent_id,
                signed_on: now.date_naive(),
            }),
            ParentResponse::Deny => ApprovalState::Unsigned,
        };
        Ok(response)
    }

    /// In-app signature by a linked parent
    pub fn sign(&mut self, parent_id: Uuid, today: NaiveDate) -> Result<(), PracticeError> {
        if self.is_signed() {
            return Err(PracticeError::AlreadySigned);
        }

        self.approval = ApprovalState::Signed(Signature {
            method: SignatureMethod::Parent,
            parent_id: Some(parent_id),
            signed_on: today,
        });
        Ok(())
    }

    /// Text sent to a parent when approval is requested
    pub fn approval_message(&self, student_name: &str) -> String {
        format!(
            "{} has logged {} minutes of practice for the week of {}. Reply Y to approve or N to deny.",
            student_name,
            self.minutes.total(),
            self.week_start_date
        )
    }

    pub fn view(&self) -> PracticeRecordView {
        PracticeRecordView::from(self)
    }
}

/// Serialized form of a practice record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PracticeRecordView {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_start_date: NaiveDate,
    #[serde(flatten)]
    pub minutes: WeeklyMinutes,
    #[serde(flatten)]
    pub score: PracticeScore,
    pub status: ApprovalStatus,
    pub parent_signature_id: Option<Uuid>,
    pub signature_date: Option<NaiveDate>,
    pub signature_method: Option<SignatureMethod>,
    pub verification_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PracticeRecord> for PracticeRecordView {
    fn from(record: &PracticeRecord) -> Self {
        let signature = record.approval.signature();
        let verification_expiry = match &record.approval {
            ApprovalState::Pending { expires_at, .. } => Some(*expires_at),
            _ => None,
        };

        PracticeRecordView {
            id: record.id,
            student_id: record.student_id,
            week_start_date: record.week_start_date,
            minutes: record.minutes,
            score: record.score(),
            status: record.approval.status(),
            parent_signature_id: signature.and_then(|s| s.parent_id),
            signature_date: signature.map(|s| s.signed_on),
            signature_method: signature.map(|s| s.method),
            verification_expiry,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PracticeRecord {
        let now = "2024-03-11T18:00:00Z".parse().unwrap();
        PracticeRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "2024-03-11".parse().unwrap(),
            now,
        )
    }

    #[test]
    fn test_day_parse() {
        assert_eq!("Monday".parse::<PracticeDay>().unwrap(), PracticeDay::Monday);
        assert_eq!(" sunday".parse::<PracticeDay>().unwrap(), PracticeDay::Sunday);
        assert!("funday".parse::<PracticeDay>().is_err());
    }

    #[test]
    fn test_empty_week_scores_minimum() {
        let score = record().score();
        assert_eq!(score.total_minutes, 0);
        assert_eq!(score.base_points, MIN_BASE_POINTS);
        assert_eq!(score.total_points, 35);
    }

    #[test]
    fn test_partial_minutes_json() {
        let minutes: WeeklyMinutes = serde_json::from_str(r#"{"monday_minutes": 30}"#).unwrap();
        assert_eq!(minutes.get(PracticeDay::Monday), 30);
        assert_eq!(minutes.get(PracticeDay::Sunday), 0);
        assert_eq!(serde_json::from_str::<WeeklyMinutes>("{}").unwrap(), WeeklyMinutes::default());
    }

    #[test]
    fn test_national_number_matches_gateway_form() {
        let mut rec = record();
        rec.request_approval("(555) 123-4567", rec.updated_at, Duration::hours(1))
            .unwrap();
        assert!(matches!(
            &rec.approval,
            ApprovalState::Pending { phone, .. } if *phone == canonical_phone_number("+1 555 123 4567")
        ));
    }

    #[test]
    fn test_max_weekly_points() {
        assert_eq!(MAX_WEEKLY_POINTS, 105);
    }

    #[test]
    fn test_set_minutes_cancels_pending_request() {
        let mut rec = record();
        let now = rec.created_at;
        rec.request_approval("+15551234567", now, Duration::hours(24)).unwrap();
        rec.set_minutes(PracticeDay::Tuesday, 30).unwrap();
        assert_eq!(rec.approval, ApprovalState::Unsigned);
    }

    #[test]
    fn test_view_reflects_signature() {
        let mut rec = record();
        let parent = Uuid::new_v4();
        rec.sign(parent, "2024-03-17".parse().unwrap()).unwrap();
        let view = rec.view();
        assert_eq!(view.status, ApprovalStatus::Signed);
        assert_eq!(view.parent_signature_id, Some(parent));
        assert_eq!(view.signature_method, Some(SignatureMethod::Parent));
        assert_eq!(view.score.parent_signature_points, PARENT_SIGNATURE_POINTS);
    }

    #[test]
    fn test_view_serializes_flat_minutes() {
        let mut rec = record();
        rec.set_minutes(PracticeDay::Monday, 25).unwrap();
        let json = serde_json::to_value(rec.view()).unwrap();
        assert_eq!(json["monday_minutes"], 25);
        assert_eq!(json["total_minutes"], 25);
        assert_eq!(json["base_points"], 40);
        assert_eq!(json["status"], "unsigned");
    }

    #[test]
    fn test_approval_message() {
        let mut rec = record();
        rec.set_minutes(PracticeDay::Monday, 45).unwrap();
        assert_eq!(
            rec.approval_message("Ada Lovelace"),
            "Ada Lovelace has logged 45 minutes of practice for the week of 2024-03-11. Reply Y to approve or N to deny."
        );
    }
}
