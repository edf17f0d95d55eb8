use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;
use super::user::UserSummary;

/// 报销状态：Pending -> Approved -> Paid，或 Pending -> Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReimbursementStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl ReimbursementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReimbursementStatus::Pending => "Pending",
            ReimbursementStatus::Approved => "Approved",
            ReimbursementStatus::Rejected => "Rejected",
            ReimbursementStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for ReimbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReimbursementStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ReimbursementStatus::Pending),
            "Approved" => Ok(ReimbursementStatus::Approved),
            "Rejected" => Ok(ReimbursementStatus::Rejected),
            "Paid" => Ok(ReimbursementStatus::Paid),
            other => Err(ParseEnumError::new("reimbursement status", other)),
        }
    }
}

impl TryFrom<String> for ReimbursementStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 票据引用，文件本身不经过本服务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reimbursement {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub amount: f64,
    pub description: Option<String>,
    pub receipts: Vec<Receipt>,
    pub status: ReimbursementStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReimbursement {
    pub employee_id: Uuid,
    pub amount: f64,
    pub description: Option<String>,
    pub receipts: Vec<Receipt>,
}

/// 状态变更，写入时要求原状态仍为 `from`
#[derive(Debug, Clone)]
pub struct ReimbursementTransition {
    pub from: ReimbursementStatus,
    pub to: ReimbursementStatus,
    /// 审批人，付款时沿用原审批人
    pub approved_by: Option<Uuid>,
    pub at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReimbursementFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<ReimbursementStatus>,
}

impl ReimbursementFilter {
    pub fn matches(&self, reimbursement: &Reimbursement) -> bool {
        self.employee_id.is_none_or(|id| id == reimbursement.employee_id)
            && self.status.is_none_or(|status| status == reimbursement.status)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementView {
    #[serde(flatten)]
    pub reimbursement: Reimbursement,
    pub employee: Option<UserSummary>,
    pub approver: Option<UserSummary>,
}
