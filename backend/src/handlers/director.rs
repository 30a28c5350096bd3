//! HTTP handlers for the director dashboard

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::AppJson,
    services::{
        director::{parse_week_start, RecordWithStudent, WeeklyRecordCsvRow},
        DirectorService, FamilyService,
    },
    AppState,
};
use shared::{DateRange, PracticeRecordView, StudentStatistics, UserSummary, WeeklyStatistics};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Debug, Deserialize)]
pub struct LinkParentRequest {
    pub parent_id: Uuid,
}

#[derive(Serialize)]
pub struct StudentsResponse {
    pub students: Vec<UserSummary>,
}

#[derive(Serialize)]
pub struct ParentsResponse {
    pub parents: Vec<UserSummary>,
}

#[derive(Serialize)]
pub struct WeekRecordsResponse {
    pub records: Vec<RecordWithStudent>,
}

#[derive(Serialize)]
pub struct StudentRecordsResponse {
    pub student: UserSummary,
    pub records: Vec<PracticeRecordView>,
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub statistics: Vec<StudentStatistics>,
    pub period: DateRange,
}

#[derive(Serialize)]
pub struct WeeklyStatisticsResponse {
    pub weeks: Vec<WeeklyStatistics>,
    pub period: DateRange,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn list_students(State(state): State<AppState>) -> AppResult<Json<StudentsResponse>> {
    let students = DirectorService::new(state.db).list_students().await?;
    Ok(Json(StudentsResponse { students }))
}

pub async fn list_parents(State(state): State<AppState>) -> AppResult<Json<ParentsResponse>> {
    let parents = DirectorService::new(state.db).list_parents().await?;
    Ok(Json(ParentsResponse { parents }))
}

/// Every student's record for one week, as JSON or a CSV download
pub async fn week_records(
    State(state): State<AppState>,
    Path(week_start_date): Path<String>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let week_start = parse_week_start(&week_start_date)?;
    let records = DirectorService::new(state.db)
        .records_for_week(week_start)
        .await?;

    if query.format.as_deref() == Some("csv") {
        let rows: Vec<WeeklyRecordCsvRow> = records.iter().map(WeeklyRecordCsvRow::from).collect();
        let csv = DirectorService::export_to_csv(&rows)?;
        let disposition = format!("attachment; filename=\"practice-{}.csv\"", week_start);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(WeekRecordsResponse { records }).into_response())
    }
}

pub async fn student_records(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> AppResult<Json<StudentRecordsResponse>> {
    let (student, records) = DirectorService::new(state.db)
        .student_records(student_id)
        .await?;
    Ok(Json(StudentRecordsResponse {
        student,
        records: records.iter().map(|r| r.view()).collect(),
    }))
}

pub async fn link_parent(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    AppJson(request): AppJson<LinkParentRequest>,
) -> AppResult<impl IntoResponse> {
    FamilyService::new(state.db)
        .link(student_id, request.parent_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Parent linked to student",
        }),
    ))
}

pub async fn unlink_parent(
    State(state): State<AppState>,
    Path((student_id, parent_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<MessageResponse>> {
    FamilyService::new(state.db)
        .unlink(student_id, parent_id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Parent unlinked from student",
    }))
}

/// Per-student statistics over the last four weeks
pub async fn statistics(State(state): State<AppState>) -> AppResult<Json<StatisticsResponse>> {
    let (statistics, period) = DirectorService::new(state.db)
        .statistics(Utc::now().date_naive())
        .await?;
    Ok(Json(StatisticsResponse { statistics, period }))
}

pub async fn weekly_statistics(
    State(state): State<AppState>,
) -> AppResult<Json<WeeklyStatisticsResponse>> {
    let (weeks, period) = DirectorService::new(state.db)
        .weekly_statistics(Utc::now().date_naive())
        .await?;
    Ok(Json(WeeklyStatisticsResponse { weeks, period }))
}
