use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    common::PageRequest,
    error::{AppError, AppResult},
    middleware::{Client, CurrentUser},
    models::{AuditEntry, LeaveFilter, LeaveStatus, audit::actions},
    services::{
        audit,
        leave::{self, LeaveAction},
    },
    utils::success_to_api_response,
};

use super::model::{ApplyLeaveRequest, LeaveDecisionRequest, LeaveListQuery, YearQuery};

#[axum::debug_handler]
pub async fn apply_leave(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<ApplyLeaveRequest>,
) -> AppResult<impl IntoResponse> {
    let view = leave::apply(&state, &actor, req.into()).await?;
    Ok((StatusCode::CREATED, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn list_leaves(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<LeaveListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<LeaveStatus>()
                .map_err(|_| AppError::Validation("Invalid status".to_string()))
        })
        .transpose()?;
    let filter = LeaveFilter {
        employee_id: query.employee,
        status,
    };
    let page = PageRequest::from(&query.page_query());

    let leaves = leave::list(&state, &actor, filter, page).await?;
    Ok((StatusCode::OK, success_to_api_response(leaves)))
}

#[axum::debug_handler]
pub async fn get_leave(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = leave::get(&state, &actor, id).await?;
    Ok((StatusCode::OK, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn decide_leave(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<LeaveDecisionRequest>,
) -> AppResult<impl IntoResponse> {
    let action: LeaveAction = req.action.trim().parse()?;
    let view = leave::approve_or_reject(&state, &actor, id, action, req.rejection_reason).await?;

    let name = match action {
        LeaveAction::Approve => actions::LEAVE_APPROVE,
        LeaveAction::Reject => actions::LEAVE_REJECT,
    };
    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(name, actor.id, &meta)
            .target("Leave", view.leave.id)
            .details(&serde_json::json!({
                "employeeId": view.leave.employee_id,
                "conflictDetected": view.leave.conflict_detected,
            })),
    );
    Ok((StatusCode::OK, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn my_balance(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<YearQuery>,
) -> AppResult<impl IntoResponse> {
    let balance = leave::balance(&state, &actor, None, query.year).await?;
    Ok((StatusCode::OK, success_to_api_response(balance)))
}

#[axum::debug_handler]
pub async fn user_balance(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<YearQuery>,
) -> AppResult<impl IntoResponse> {
    let balance = leave::balance(&state, &actor, Some(user_id), query.year).await?;
    Ok((StatusCode::OK, success_to_api_response(balance)))
}
