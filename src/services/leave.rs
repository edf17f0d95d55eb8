//! 请假
//!
//! 冲突检测只是提示：与已批准假期重叠时仍然允许申请和审批，
//! 结果记录在 `conflict_detected` 上。

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use super::authorization::{self, PRIVILEGED};
use crate::AppState;
use crate::common::{PageRequest, PaginatedResponse};
use crate::error::{AppError, AppResult};
use crate::models::{
    Leave, LeaveBalance, LeaveDecision, LeaveFilter, LeaveStatus, LeaveType, LeaveView, NewLeave,
    User, UserSummary,
};

/// 年度额度，所有假期类型共用一个池
pub const CASUAL_QUOTA_DAYS: i64 = 12;
pub const EARNED_QUOTA_DAYS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    Approve,
    Reject,
}

impl FromStr for LeaveAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(LeaveAction::Approve),
            "reject" => Ok(LeaveAction::Reject),
            _ => Err(AppError::Validation(
                "action must be approve or reject".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaveApplication {
    /// 仅 ADMIN/MANAGER 可以代他人申请
    pub employee_id: Option<Uuid>,
    pub leave_type: String,
    pub from_date: String,
    pub to_date: String,
    pub reason: Option<String>,
}

/// 两个闭区间是否重叠，首尾相接也算
pub fn ranges_overlap(
    a_from: NaiveDate,
    a_to: NaiveDate,
    b_from: NaiveDate,
    b_to: NaiveDate,
) -> bool {
    a_from <= b_to && a_to >= b_from
}

/// 已批准假期里是否有与 `[from, to]` 重叠的，`exclude` 用于审批时排除自身
pub fn has_conflict(
    approved: &[Leave],
    from: NaiveDate,
    to: NaiveDate,
    exclude: Option<Uuid>,
) -> bool {
    approved
        .iter()
        .filter(|l| l.status == LeaveStatus::Approved && Some(l.id) != exclude)
        .any(|l| ranges_overlap(from, to, l.from_date, l.to_date))
}

pub async fn detect_conflict(
    state: &AppState,
    employee_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    exclude: Option<Uuid>,
) -> AppResult<bool> {
    let approved = state
        .repos
        .leaves
        .find_approved(employee_id, exclude)
        .await?;
    Ok(has_conflict(&approved, from, to, exclude))
}

/// 接受 `YYYY-MM-DD` 或 RFC 3339 时间
pub fn parse_date(field: &str, value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::Validation(format!("{field} must be a valid date")))
}

/// 批量补上员工和审批人信息
async fn to_views(state: &AppState, leaves: Vec<Leave>) -> AppResult<Vec<LeaveView>> {
    let mut ids: Vec<Uuid> = leaves
        .iter()
        .flat_map(|l| std::iter::once(l.employee_id).chain(l.approved_by))
        .collect();
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

    Ok(leaves
        .into_iter()
        .map(|leave| LeaveView {
            employee: users.get(&leave.employee_id).cloned(),
            approver: leave.approved_by.and_then(|id| users.get(&id).cloned()),
            leave,
        })
        .collect())
}

async fn to_view(state: &AppState, leave: Leave) -> AppResult<LeaveView> {
    to_views(state, vec![leave])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("leave view missing".to_string()))
}

pub async fn apply(
    state: &AppState,
    actor: &User,
    application: LeaveApplication,
) -> AppResult<LeaveView> {
    let leave_type = LeaveType::from_str(application.leave_type.trim())
        .map_err(|_| AppError::Validation("Invalid leave type".to_string()))?;
    let from_date = parse_date("fromDate", &application.from_date)?;
    let to_date = parse_date("toDate", &application.to_date)?;
    if to_date < from_date {
        return Err(AppError::Validation(
            "toDate must be after fromDate".to_string(),
        ));
    }

    let employee_id = match application.employee_id {
        Some(id) if actor.role.is_privileged() && id != actor.id => {
            state
                .repos
                .users
                .find_by_id(id)
                .await?
                .ok_or(AppError::NotFound("Employee"))?;
            id
        }
        _ => actor.id,
    };

    let conflict_detected = detect_conflict(state, employee_id, from_date, to_date, None).await?;
    let leave = state
        .repos
        .leaves
        .insert(NewLeave {
            employee_id,
            leave_type,
            from_date,
            to_date,
            reason: application
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            conflict_detected,
        })
        .await?;

    tracing::info!(leave_id = %leave.id, employee_id = %employee_id, conflict_detected, "Leave applied");
    to_view(state, leave).await
}

/// 审批或驳回，只处理 Pending 状态的申请
pub async fn approve_or_reject(
    state: &AppState,
    actor: &User,
    leave_id: Uuid,
    action: LeaveAction,
    rejection_reason: Option<String>,
) -> AppResult<LeaveView> {
    authorization::require_role(actor, PRIVILEGED)?;

    let leave = state
        .repos
        .leaves
        .find_by_id(leave_id)
        .await?
        .ok_or(AppError::NotFound("Leave"))?;
    if leave.status != LeaveStatus::Pending {
        return Err(AppError::AlreadyProcessed);
    }

    let decision = match action {
        LeaveAction::Approve => LeaveDecision {
            status: LeaveStatus::Approved,
            approved_by: actor.id,
            approved_at: Utc::now(),
            rejection_reason: None,
            conflict_detected: detect_conflict(
                state,
                leave.employee_id,
                leave.from_date,
                leave.to_date,
                Some(leave.id),
            )
            .await?,
        },
        LeaveAction::Reject => {
            let reason = rejection_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or_else(|| AppError::Validation("rejectionReason is required".to_string()))?;
            LeaveDecision {
                status: LeaveStatus::Rejected,
                approved_by: actor.id,
                approved_at: Utc::now(),
                rejection_reason: Some(reason),
                conflict_detected: leave.conflict_detected,
            }
        }
    };

    // 条件更新失败说明并发请求已经处理过
    let updated = state
        .repos
        .leaves
        .decide(leave.id, &decision)
        .await?
        .ok_or(AppError::AlreadyProcessed)?;

    tracing::info!(leave_id = %updated.id, status = %updated.status, approver = %actor.id, "Leave processed");
    to_view(state, updated).await
}

pub async fn list(
    state: &AppState,
    actor: &User,
    requested: LeaveFilter,
    page: PageRequest,
) -> AppResult<PaginatedResponse<LeaveView>> {
    let filter = LeaveFilter {
        employee_id: authorization::scope_employee(actor, requested.employee_id),
        ..requested
    };
    let (leaves, total) = state.repos.leaves.list(&filter, page).await?;
    Ok(PaginatedResponse::new(
        to_views(state, leaves).await?,
        total,
        page,
    ))
}

pub async fn get(state: &AppState, actor: &User, leave_id: Uuid) -> AppResult<LeaveView> {
    let leave = state
        .repos
        .leaves
        .find_by_id(leave_id)
        .await?
        .ok_or(AppError::NotFound("Leave"))?;
    authorization::ensure_self_or_roles(actor, leave.employee_id, PRIVILEGED)?;
    to_view(state, leave).await
}

/// 年度已用天数与剩余额度
pub fn summarize_balance(year: i32, approved_in_year: &[Leave]) -> LeaveBalance {
    let used: i64 = approved_in_year.iter().map(Leave::days).sum();
    LeaveBalance {
        year,
        total_days_used: used,
        casual_remaining: (CASUAL_QUOTA_DAYS - used).max(0),
        earned_remaining: (EARNED_QUOTA_DAYS - used).max(0),
    }
}

pub async fn balance(
    state: &AppState,
    actor: &User,
    user_id: Option<Uuid>,
    year: Option<i32>,
) -> AppResult<LeaveBalance> {
    let user_id = user_id.unwrap_or(actor.id);
    authorization::ensure_self_or_roles(actor, user_id, PRIVILEGED)?;

    let year = year.unwrap_or_else(|| Utc::now().year());
    let (start, end) = NaiveDate::from_ymd_opt(year, 1, 1)
        .zip(NaiveDate::from_ymd_opt(year, 12, 31))
        .ok_or_else(|| AppError::Validation("Invalid year".to_string()))?;

    let approved = state
        .repos
        .leaves
        .find_approved_within(user_id, start, end)
        .await?;
    Ok(summarize_balance(year, &approved))
}
