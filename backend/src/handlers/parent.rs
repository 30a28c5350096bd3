//! HTTP handlers for parents reviewing and signing their children's weeks

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    handlers::student::{RecordResponse, RecordsResponse},
    middleware::CurrentUser,
    services::{FamilyService, PracticeService},
    AppState,
};
use shared::UserSummary;

#[derive(Debug, Serialize)]
pub struct ChildrenResponse {
    pub children: Vec<UserSummary>,
}

pub async fn list_children(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<ChildrenResponse>> {
    let service = FamilyService::new(state.db);
    let children = service.children_of(user.user_id).await?;
    Ok(Json(ChildrenResponse { children }))
}

pub async fn child_records(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(child_id): Path<Uuid>,
) -> AppResult<Json<RecordsResponse>> {
    FamilyService::new(state.db.clone())
        .ensure_linked(user.user_id, child_id, "view")
        .await?;

    let records = PracticeService::new(state.db)
        .list_for_student(child_id)
        .await?;
    Ok(Json(RecordsResponse {
        records: records.iter().map(|r| r.view()).collect(),
    }))
}

pub async fn child_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((child_id, record_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RecordResponse>> {
    FamilyService::new(state.db.clone())
        .ensure_linked(user.user_id, child_id, "view")
        .await?;

    let record = PracticeService::new(state.db)
        .get_for_student(child_id, record_id)
        .await?;
    Ok(Json(RecordResponse::bare(record.view())))
}

/// Sign a child's week
pub async fn sign_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((child_id, record_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RecordResponse>> {
    FamilyService::new(state.db.clone())
        .ensure_linked(user.user_id, child_id, "sign")
        .await?;

    let record = PracticeService::new(state.db)
        .sign(user.user_id, child_id, record_id)
        .await?;
    Ok(Json(RecordResponse::with_message(
        "Practice record signed successfully",
        record.view(),
    )))
}
