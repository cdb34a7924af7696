use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::error::AppError;
use crate::models::api_models::{
    AttendanceListResponse, FollowupOwnerRequest, FullListResponse, MarkPresentRequest,
    MarkRegisteredRequest, MessageResponse, NameResponse, NamesResponse, PhoneQuery,
};
use crate::services::attendance_service;
use crate::state::AppState;

pub async fn get_names_handler(
    State(state): State<AppState>,
) -> Result<Json<NamesResponse>, AppError> {
    let names = attendance_service::list_names(state.sheet.as_ref(), &state.config).await?;
    Ok(Json(NamesResponse { names }))
}

pub async fn attendance_list_handler(
    State(state): State<AppState>,
) -> Result<Json<AttendanceListResponse>, AppError> {
    let entries = attendance_service::list_attendance(state.sheet.as_ref(), &state.config).await?;
    Ok(Json(AttendanceListResponse { entries }))
}

pub async fn full_list_handler(
    State(state): State<AppState>,
    Json(body): Json<FollowupOwnerRequest>,
) -> Result<Json<FullListResponse>, AppError> {
    let entries = attendance_service::list_by_followup_owner(
        state.sheet.as_ref(),
        &state.config,
        &body.followup_owner,
    )
    .await?;
    Ok(Json(FullListResponse { entries }))
}

pub async fn name_from_phone_handler(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<NameResponse>, AppError> {
    let phone = query
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Phone number is required".into()))?;

    let name = attendance_service::name_for_phone(state.sheet.as_ref(), &state.config, phone).await?;
    Ok(Json(NameResponse { name }))
}

pub async fn mark_present_handler(
    State(state): State<AppState>,
    Json(body): Json<MarkPresentRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    attendance_service::mark_present(
        state.sheet.as_ref(),
        &state.config,
        &body.name,
        body.event.as_deref(),
    )
    .await?;
    info!(name = %body.name, "✅ attendance marked");
    Ok(Json(MessageResponse::new("Attendance marked as Present")))
}

pub async fn mark_registered_handler(
    State(state): State<AppState>,
    Json(body): Json<MarkRegisteredRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let changed = attendance_service::mark_registered(
        state.sheet.as_ref(),
        &state.config,
        &body.contact,
        body.event.as_deref(),
    )
    .await?;

    let message = if changed {
        "Registration marked as Registered"
    } else {
        "Registration already recorded"
    };
    Ok(Json(MessageResponse::new(message)))
}
