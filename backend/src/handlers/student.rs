//! HTTP handlers for the student practice log

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    extract::AppJson,
    external::sms,
    middleware::CurrentUser,
    services::{FamilyService, PracticeService},
    AppState,
};
use shared::{PracticeDay, PracticeRecordView, UserSummary};

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub record: PracticeRecordView,
}

impl RecordResponse {
    pub fn with_message(message: &'static str, record: PracticeRecordView) -> Self {
        Self {
            message: Some(message),
            record,
        }
    }

    pub fn bare(record: PracticeRecordView) -> Self {
        Self {
            message: None,
            record,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<PracticeRecordView>,
}

#[derive(Debug, Serialize)]
pub struct ParentsResponse {
    pub parents: Vec<UserSummary>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePracticeRequest {
    pub day: String,
    pub minutes: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendVerificationRequest {
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub parent_phone_number: String,
    pub record_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPracticeRequest {
    #[validate(length(min = 1, message = "Parent response is required"))]
    pub parent_response: String,
    pub record_id: Uuid,
}

/// Find or create this week's record
pub async fn current_week(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<RecordResponse>> {
    let service = PracticeService::new(state.db);
    let current = service.current_week(user.user_id, Utc::now().date_naive()).await?;

    let message = if current.created {
        "New practice record created"
    } else {
        "Practice record found"
    };
    Ok(Json(RecordResponse::with_message(message, current.record.view())))
}

/// All of the student's records, newest week first
pub async fn list_records(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<RecordsResponse>> {
    let service = PracticeService::new(state.db);
    let records = service.list_for_student(user.user_id).await?;
    Ok(Json(RecordsResponse {
        records: records.iter().map(|r| r.view()).collect(),
    }))
}

pub async fn get_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<RecordResponse>> {
    let service = PracticeService::new(state.db);
    let record = service.get_for_student(user.user_id, record_id).await?;
    Ok(Json(RecordResponse::bare(record.view())))
}

/// Set the minutes for one day
pub async fn update_practice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(record_id): Path<Uuid>,
    AppJson(request): AppJson<UpdatePracticeRequest>,
) -> AppResult<Json<RecordResponse>> {
    let day = request.day.parse::<PracticeDay>()?;

    let service = PracticeService::new(state.db);
    let record = service
        .update_minutes(user.user_id, record_id, day, request.minutes)
        .await?;

    Ok(Json(RecordResponse::with_message(
        "Practice time updated successfully",
        record.view(),
    )))
}

pub async fn list_parents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ParentsResponse>> {
    let service = FamilyService::new(state.db);
    let parents = service.parents_of(user.user_id).await?;
    Ok(Json(ParentsResponse { parents }))
}

/// Text a parent asking them to approve the week
pub async fn send_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<SendVerificationRequest>,
) -> AppResult<Json<RecordResponse>> {
    request.validate()?;

    let ttl = Duration::hours(state.config.verification.expiry_hours);
    let service = PracticeService::new(state.db);
    let (record, message) = service
        .request_approval(user.user_id, request.record_id, &request.parent_phone_number, ttl)
        .await?;

    let phone = shared::canonical_phone_number(&request.parent_phone_number);
    sms::dispatch(state.sms.as_ref(), &phone, &message).await?;

    Ok(Json(RecordResponse::with_message(
        "Verification code sent to parent's phone",
        record.view(),
    )))
}

/// Record the parent's reply relayed by the student
pub async fn verify_practice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(request): AppJson<VerifyPracticeRequest>,
) -> AppResult<Json<RecordResponse>> {
    request.validate()?;

    let service = PracticeService::new(state.db);
    let (response, record) = service
        .verify(user.user_id, request.record_id, &request.parent_response)
        .await?;

    Ok(Json(RecordResponse::with_message(
        response.outcome_message(),
        record.view(),
    )))
}
