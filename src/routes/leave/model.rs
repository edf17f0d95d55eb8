use serde::Deserialize;
use uuid::Uuid;

use crate::common::PageQuery;
use crate::services::leave::LeaveApplication;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLeaveRequest {
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub leave_type: String,
    #[serde(default)]
    pub from_date: String,
    #[serde(default)]
    pub to_date: String,
    pub reason: Option<String>,
}

impl From<ApplyLeaveRequest> for LeaveApplication {
    fn from(req: ApplyLeaveRequest) -> Self {
        Self {
            employee_id: req.employee_id,
            leave_type: req.leave_type,
            from_date: req.from_date,
            to_date: req.to_date,
            reason: req.reason,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaveListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub employee: Option<Uuid>,
    pub status: Option<String>,
}

impl LeaveListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDecisionRequest {
    #[serde(default)]
    pub action: String,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}
