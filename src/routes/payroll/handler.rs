use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    AppState,
    common::PageRequest,
    error::{AppError, AppResult},
    middleware::{Client, CurrentUser},
    models::{AuditEntry, PayrollFilter, audit::actions},
    services::{audit, payroll},
    utils::success_to_api_response,
};

use super::model::{GeneratePayrollRequest, PayrollListQuery, YtdQuery};

#[axum::debug_handler]
pub async fn generate_payroll(
    State(state): State<AppState>,
    actor: CurrentUser,
    Client(meta): Client,
    Json(req): Json<GeneratePayrollRequest>,
) -> AppResult<impl IntoResponse> {
    let view = payroll::generate(&state, &actor, req.try_into()?).await?;

    audit::emit(
        &state.repos.audit_logs,
        AuditEntry::new(actions::PAYROLL_GENERATE, actor.id, &meta)
            .target("Payroll", view.payroll.id)
            .details(&serde_json::json!({
                "employeeId": view.payroll.employee_id,
                "month": view.payroll.month,
                "year": view.payroll.year,
                "netSalary": view.payroll.net_salary,
            })),
    );
    Ok((StatusCode::CREATED, success_to_api_response(view)))
}

#[axum::debug_handler]
pub async fn list_payrolls(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<PayrollListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = PayrollFilter {
        employee_id: query.employee,
        month: query.month,
        year: query.year,
    };
    let page = PageRequest::from(&query.page_query());

    let payrolls = payroll::list(&state, &actor, filter, page).await?;
    Ok((StatusCode::OK, success_to_api_response(payrolls)))
}

#[axum::debug_handler]
pub async fn get_payroll(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let view = payroll::get(&state, &actor, id).await?;
    Ok((StatusCode::OK, success_to_api_response(view)))
}

/// 工资条 PDF 以附件形式返回
#[axum::debug_handler]
pub async fn download_payroll(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let slip = payroll::download(&state, &actor, id).await?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        slip.file_name
    ))
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        slip.bytes,
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn my_ytd(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<YtdQuery>,
) -> AppResult<impl IntoResponse> {
    let summary = payroll::ytd_summary(&state, &actor, None, query.year).await?;
    Ok((StatusCode::OK, success_to_api_response(summary)))
}

#[axum::debug_handler]
pub async fn user_ytd(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<YtdQuery>,
) -> AppResult<impl IntoResponse> {
    let summary = payroll::ytd_summary(&state, &actor, Some(user_id), query.year).await?;
    Ok((StatusCode::OK, success_to_api_response(summary)))
}
