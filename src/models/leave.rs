use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ParseEnumError;
use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveType {
    Sick,
    Casual,
    Earned,
    Maternity,
    Paternity,
    Unpaid,
    Other,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Sick => "Sick",
            LeaveType::Casual => "Casual",
            LeaveType::Earned => "Earned",
            LeaveType::Maternity => "Maternity",
            LeaveType::Paternity => "Paternity",
            LeaveType::Unpaid => "Unpaid",
            LeaveType::Other => "Other",
        }
    }
}

impl FromStr for LeaveType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sick" => Ok(LeaveType::Sick),
            "Casual" => Ok(LeaveType::Casual),
            "Earned" => Ok(LeaveType::Earned),
            "Maternity" => Ok(LeaveType::Maternity),
            "Paternity" => Ok(LeaveType::Paternity),
            "Unpaid" => Ok(LeaveType::Unpaid),
            "Other" => Ok(LeaveType::Other),
            other => Err(ParseEnumError::new("leave type", other)),
        }
    }
}

impl TryFrom<String> for LeaveType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 请假状态，只允许 Pending -> Approved 或 Pending -> Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(LeaveStatus::Pending),
            "Approved" => Ok(LeaveStatus::Approved),
            "Rejected" => Ok(LeaveStatus::Rejected),
            other => Err(ParseEnumError::new("leave status", other)),
        }
    }
}

impl TryFrom<String> for LeaveStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 请假记录
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeaveStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// 审批时与其他已批准假期重叠，仅作提示
    pub conflict_detected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Leave {
    /// 含首尾的天数
    pub fn days(&self) -> i64 {
        (self.to_date - self.from_date).num_days() + 1
    }
}

#[derive(Debug, Clone)]
pub struct NewLeave {
    pub employee_id: Uuid,
    pub leave_type: LeaveType,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: Option<String>,
    pub conflict_detected: bool,
}

/// 审批结果，写入时要求原状态仍为 Pending
#[derive(Debug, Clone)]
pub struct LeaveDecision {
    pub status: LeaveStatus,
    pub approved_by: Uuid,
    pub approved_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
    pub conflict_detected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
}

impl LeaveFilter {
    pub fn matches(&self, leave: &Leave) -> bool {
        self.employee_id.is_none_or(|id| id == leave.employee_id)
            && self.status.is_none_or(|status| status == leave.status)
    }
}

/// 带员工和审批人信息的请假记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveView {
    #[serde(flatten)]
    pub leave: Leave,
    pub employee: Option<UserSummary>,
    pub approver: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub year: i32,
    pub total_days_used: i64,
    pub casual_remaining: i64,
    pub earned_remaining: i64,
}
