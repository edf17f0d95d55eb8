//! 工资单
//!
//! `gross = basic + Σ allowances`，`net = gross - Σ deductions`。
//! 每个员工每月只能有一条，先查一次，插入时唯一索引冲突也映射为同一个错误。
//! 工资条生成失败不影响工资单本身。

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use super::authorization::{self, PRIVILEGED};
use super::document::slip_file_name;
use crate::AppState;
use crate::common::{PageRequest, PaginatedResponse};
use crate::database::StoreError;
use crate::error::{AppError, AppResult};
use crate::models::{
    NewPayroll, Payroll, PayrollFilter, PayrollView, SalaryItems, User, UserSummary, YtdSummary,
};

#[derive(Debug, Clone)]
pub struct PayrollRequest {
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: SalaryItems,
    pub deductions: SalaryItems,
}

/// 工资条文件
#[derive(Debug)]
pub struct SlipDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 计算 (gross, net)
pub fn compute(basic_salary: f64, allowances: &SalaryItems, deductions: &SalaryItems) -> (f64, f64) {
    let gross = basic_salary + allowances.values().sum::<f64>();
    let net = gross - deductions.values().sum::<f64>();
    (gross, net)
}

fn validate_amount(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

pub fn validate(request: &PayrollRequest) -> AppResult<()> {
    if !(1..=12).contains(&request.month) {
        return Err(AppError::Validation(
            "month must be between 1 and 12".to_string(),
        ));
    }
    if !(1900..=9999).contains(&request.year) {
        return Err(AppError::Validation("year is out of range".to_string()));
    }
    validate_amount("basicSalary", request.basic_salary)?;
    for (name, value) in &request.allowances {
        validate_amount(&format!("allowances.{name}"), *value)?;
    }
    for (name, value) in &request.deductions {
        validate_amount(&format!("deductions.{name}"), *value)?;
    }
    Ok(())
}

async fn to_views(state: &AppState, payrolls: Vec<Payroll>) -> AppResult<Vec<PayrollView>> {
    let mut ids: Vec<Uuid> = payrolls.iter().map(|p| p.employee_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = state
        .repos
        .users
        .find_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(payrolls
        .into_iter()
        .map(|payroll| PayrollView {
            employee: users.get(&payroll.employee_id).cloned(),
            payroll,
        })
        .collect())
}

pub async fn generate(
    state: &AppState,
    actor: &User,
    request: PayrollRequest,
) -> AppResult<PayrollView> {
    authorization::require_role(actor, PRIVILEGED)?;
    validate(&request)?;

    let employee = state
        .repos
        .users
        .find_by_id(request.employee_id)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    if state
        .repos
        .payrolls
        .find_by_period(employee.id, request.month, request.year)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicatePayroll);
    }

    let (gross_salary, net_salary) =
        compute(request.basic_salary, &request.allowances, &request.deductions);
    let mut payroll = state
        .repos
        .payrolls
        .insert(NewPayroll {
            employee_id: employee.id,
            month: request.month,
            year: request.year,
            basic_salary: request.basic_salary,
            allowances: request.allowances,
            deductions: request.deductions,
            gross_salary,
            net_salary,
            currency: state.config.currency.clone(),
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation => AppError::DuplicatePayroll,
            other => other.into(),
        })?;

    match state
        .documents
        .generate_salary_slip(&payroll, &employee)
        .await
    {
        Ok(path) => match state.repos.payrolls.set_document_path(payroll.id, &path).await {
            Ok(()) => payroll.document_path = Some(path),
            Err(e) => tracing::warn!(payroll_id = %payroll.id, "Failed to store slip path: {}", e),
        },
        Err(e) => tracing::warn!(payroll_id = %payroll.id, "Salary slip generation failed: {}", e),
    }

    tracing::info!(
        payroll_id = %payroll.id,
        employee_id = %employee.id,
        month = payroll.month,
        year = payroll.year,
        "Payroll generated"
    );
    Ok(PayrollView {
        employee: Some(UserSummary::from(&employee)),
        payroll,
    })
}

pub async fn list(
    state: &AppState,
    actor: &User,
    requested: PayrollFilter,
    page: PageRequest,
) -> AppResult<PaginatedResponse<PayrollView>> {
    let filter = PayrollFilter {
        employee_id: authorization::scope_employee(actor, requested.employee_id),
        ..requested
    };
    let (payrolls, total) = state.repos.payrolls.list(&filter, page).await?;
    Ok(PaginatedResponse::new(
        to_views(state, payrolls).await?,
        total,
        page,
    ))
}

async fn find_visible(state: &AppState, actor: &User, payroll_id: Uuid) -> AppResult<Payroll> {
    let payroll = state
        .repos
        .payrolls
        .find_by_id(payroll_id)
        .await?
        .ok_or(AppError::NotFound("Payroll"))?;
    authorization::ensure_self_or_roles(actor, payroll.employee_id, PRIVILEGED)?;
    Ok(payroll)
}

pub async fn get(state: &AppState, actor: &User, payroll_id: Uuid) -> AppResult<PayrollView> {
    let payroll = find_visible(state, actor, payroll_id).await?;
    let mut views = to_views(state, vec![payroll]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("payroll view missing".to_string()))
}

pub async fn download(state: &AppState, actor: &User, payroll_id: Uuid) -> AppResult<SlipDownload> {
    let payroll = find_visible(state, actor, payroll_id).await?;
    let path = payroll
        .document_path
        .as_deref()
        .ok_or(AppError::NotFound("PDF"))?;
    let bytes = state
        .documents
        .read(path)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::NotFound("PDF"))?;

    let employee = state.repos.users.find_by_id(payroll.employee_id).await?;
    let file_name = slip_file_name(
        &payroll,
        employee.as_ref().and_then(|e| e.employee_code.as_deref()),
    );
    Ok(SlipDownload { file_name, bytes })
}

pub fn summarize_year(year: i32, payrolls: &[Payroll]) -> YtdSummary {
    YtdSummary {
        year,
        total_net: payrolls.iter().map(|p| p.net_salary).sum(),
        total_gross: payrolls.iter().map(|p| p.gross_salary).sum(),
        months_count: payrolls.len(),
    }
}

pub async fn ytd_summary(
    state: &AppState,
    actor: &User,
    employee_id: Option<Uuid>,
    year: Option<i32>,
) -> AppResult<YtdSummary> {
    let employee_id = employee_id.unwrap_or(actor.id);
    authorization::ensure_self_or_roles(actor, employee_id, PRIVILEGED)?;

    let year = year.unwrap_or_else(|| Utc::now().year());
    let payrolls = state
        .repos
        .payrolls
        .list_for_year(employee_id, year)
        .await?;
    Ok(summarize_year(year, &payrolls))
}
