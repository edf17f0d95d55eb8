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
    models::{AuditEntry, ReimbursementFilter, ReimbursementStatus, audit::actions},
    services::{
        audit,
        reimbursement::{self, ReimbursementAction},
    },
    utils::success_to_api_response,
};

use super::model::{ReimbursementActionRequest, ReimbursementListQuery, SubmitReimbursementRequest};

#[axum::debug_handler]
pub async fn submit_reimbursement(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<SubmitReimbursementRequest>,
) -> AppResult<impl IntoResponse> {
    let view = reimbursement::submit(&state, &actor, req.into()).await?;
    Ok((StatusCode::CREATED, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn list_reimbursements(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<ReimbursementListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            s.parse::<ReimbursementStatus>()
                .map_err(|_| AppError::Validation("Invalid status".to_string()))
        })
        .transpose()?;
    let filter = ReimbursementFilter {
        employee_id: query.employee,
        status,
    };
    let page = PageRequest::from(&query.page_query());

    let records = reimbursement::list(&state, &actor, filter, page).await?;
    Ok((StatusCode::OK, success_to_api_response(records)))
}

#[axum::debug_handler]
pub async fn get_reimbursement(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = reimbursement::get(&state, &actor, id).await?;
    Ok((StatusCode::OK, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn act_on_reimbursement(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Path(id): Path<Uuid>,
    Json(req): Json<ReimbursementActionRequest>,
) -> AppResult<impl IntoResponse> {
    let action: ReimbursementAction = req.action.trim().parse()?;
    let view = reimbursement::act(&state, &actor, id, action, req.rejection_reason).await?;

    let name = match action {
        ReimbursementAction::Approve => actions::REIMBURSEMENT_APPROVE,
        ReimbursementAction::Reject => actions::REIMBURSEMENT_REJECT,
        ReimbursementAction::Paid => actions::REIMBURSEMENT_PAID,
    };
    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(name, actor.id, &meta)
            .target("Reimbursement", view.reimbursement.id)
            .details(&serde_json::json!({
                "employeeId": view.reimbursement.employee_id,
                "amount": view.reimbursement.amount,
            })),
    );
    Ok((StatusCode::OK, success_to_api_response(view)))
}
