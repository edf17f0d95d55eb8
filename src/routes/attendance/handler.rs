use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    common::PageRequest,
    error::AppResult,
    middleware::{Client, CurrentUser},
    models::{AttendanceFilter, AuditEntry, audit::actions},
    services::{attendance, audit, leave::parse_date},
    utils::success_to_api_response,
};

use super::model::{AttendanceListQuery, ClockInRequest};

#[axum::debug_handler]
pub async fn clock_in(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    req: Option<Json<ClockInRequest>>,
) -> AppResult<impl IntoResponse> {
    let Json(req) = req.unwrap_or_default();
    let view = attendance::clock_in(&state, &actor, req.location, meta.ip).await?;
    Ok((StatusCode::CREATED, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn clock_out(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let view = attendance::clock_out(&state, &actor).await?;
    Ok((StatusCode::OK, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn list_attendance(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<AttendanceListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = AttendanceFilter {
        employee_id: query.employee,
        from: query.from.as_deref().map(|d| parse_date("from", d)).transpose()?,
        to: query.to.as_deref().map(|d| parse_date("to", d)).transpose()?,
    };
    let page = PageRequest::from(&query.page_query());

    let records = attendance::list(&state, &actor, filter, page).await?;
    Ok((StatusCode::OK, success_to_api_response(records)))
}

#[axum::debug_handler]
pub async fn get_attendance(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = attendance::get(&state, &actor, id).await?;
    Ok((StatusCode::OK, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn approve_timesheet(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = attendance::approve_timesheet(&state, &actor, id).await?;

    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(actions::ATTENDANCE_APPROVE, actor.id, &meta)
            .target("Attendance", view.attendance.id)
            .details(&serde_json::json!({
                "employeeId": view.attendance.employee_id,
                "date": view.attendance.date,
            })),
    );
    Ok((StatusCode::OK, success_to_api_response(view)))
}
