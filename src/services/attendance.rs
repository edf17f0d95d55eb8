//! 考勤打卡
//!
//! 以 UTC 日期为“当天”，每个员工每天一条记录。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::authorization::{self, PRIVILEGED};
use crate::AppState;
use crate::common::{PageRequest, PaginatedResponse};
use crate::database::StoreError;
use crate::error::{AppError, AppResult};
use crate::models::{
    Attendance, AttendanceFilter, AttendanceView, NewAttendance, User, UserSummary,
};

/// 标准工作时长，超出部分记为加班
pub const STANDARD_MINUTES: i64 = 8 * 60;

/// 加班分钟数，不足标准时长为 0
pub fn overtime_minutes(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> i32 {
    let worked = (clock_out - clock_in).num_minutes();
    i32::try_from((worked - STANDARD_MINUTES).max(0)).unwrap_or(i32::MAX)
}

async fn to_views(state: &AppState, records: Vec<Attendance>) -> AppResult<Vec<AttendanceView>> {
    let mut ids: Vec<Uuid> = records
        .iter()
        .flat_map(|a| std::iter::once(a.employee_id).chain(a.approved_by))
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

    Ok(records
        .into_iter()
        .map(|attendance| AttendanceView {
            employee: users.get(&attendance.employee_id).cloned(),
            approver: attendance.approved_by.and_then(|id| users.get(&id).cloned()),
            attendance,
        })
        .collect())
}

async fn to_view(state: &AppState, attendance: Attendance) -> AppResult<AttendanceView> {
    to_views(state, vec![attendance])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("attendance view missing".to_string()))
}

pub async fn clock_in(
    state: &AppState,
    actor: &User,
    location: Option<String>,
    ip: Option<String>,
) -> AppResult<AttendanceView> {
    let now = Utc::now();
    let today = now.date_naive();

    if state
        .repos
        .attendance
        .find_for_day(actor.id, today)
        .await?
        .is_some()
    {
        return Err(AppError::Validation("Already clocked in today".to_string()));
    }

    // 并发打卡由唯一约束兜底
    let attendance = state
        .repos
        .attendance
        .insert(NewAttendance {
            employee_id: actor.id,
            date: today,
            clock_in: now,
            location: location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            ip,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation => {
                AppError::Validation("Already clocked in today".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(attendance_id = %attendance.id, employee_id = %actor.id, "Clocked in");
    to_view(state, attendance).await
}

pub async fn clock_out(state: &AppState, actor: &User) -> AppResult<AttendanceView> {
    let now = Utc::now();
    let attendance = state
        .repos
        .attendance
        .find_for_day(actor.id, now.date_naive())
        .await?
        .ok_or_else(|| AppError::Validation("Clock in first".to_string()))?;
    if attendance.clock_out.is_some() {
        return Err(AppError::Validation("Already clocked out today".to_string()));
    }

    let overtime = overtime_minutes(attendance.clock_in, now);
    let updated = state
        .repos
        .attendance
        .clock_out(attendance.id, now, overtime)
        .await?
        .ok_or_else(|| AppError::Validation("Already clocked out today".to_string()))?;

    tracing::info!(attendance_id = %updated.id, overtime_minutes = overtime, "Clocked out");
    to_view(state, updated).await
}

pub async fn list(
    state: &AppState,
    actor: &User,
    requested: AttendanceFilter,
    page: PageRequest,
) -> AppResult<PaginatedResponse<AttendanceView>> {
    let filter = AttendanceFilter {
        employee_id: authorization::scope_employee(actor, requested.employee_id),
        ..requested
    };
    let (records, total) = state.repos.attendance.list(&filter, page).await?;
    Ok(PaginatedResponse::new(
        to_views(state, records).await?,
        total,
        page,
    ))
}

pub async fn get(state: &AppState, actor: &User, id: Uuid) -> AppResult<AttendanceView> {
    let attendance = state
        .repos
        .attendance
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Attendance"))?;
    authorization::ensure_self_or_roles(actor, attendance.employee_id, PRIVILEGED)?;
    to_view(state, attendance).await
}

/// 审核考勤，重复审核会覆盖审核人
pub async fn approve_timesheet(
    state: &AppState,
    actor: &User,
    id: Uuid,
) -> AppResult<AttendanceView> {
    authorization::require_role(actor, PRIVILEGED)?;
    let attendance = state
        .repos
        .attendance
        .approve(id, actor.id, Utc::now())
        .await?
        .ok_or(AppError::NotFound("Attendance"))?;

    tracing::info!(attendance_id = %attendance.id, approver = %actor.id, "Timesheet approved");
    to_view(state, attendance).await
}
