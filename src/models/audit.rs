use serde::Serialize;
use uuid::Uuid;

use super::session::ClientMeta;

/// 敏感操作审计记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: &'static str,
    pub performed_by: Uuid,
    pub target: Option<&'static str>,
    pub target_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(action: &'static str, performed_by: Uuid, meta: &ClientMeta) -> Self {
        Self {
            action,
            performed_by,
            target: None,
            target_id: None,
            details: None,
            ip: meta.ip.clone(),
            user_agent: meta.device.clone(),
        }
    }

    pub fn target(mut self, target: &'static str, id: impl ToString) -> Self {
        self.target = Some(target);
        self.target_id = Some(id.to_string());
        self
    }

    pub fn details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }
}

pub mod actions {
    pub const USER_CREATE: &str = "USER_CREATE";
    pub const USER_UPDATE: &str = "USER_UPDATE";
    pub const USER_DEACTIVATE: &str = "USER_DEACTIVATE";
    pub const LEAVE_APPROVE: &str = "LEAVE_APPROVE";
    pub const LEAVE_REJECT: &str = "LEAVE_REJECT";
    pub const PAYROLL_GENERATE: &str = "PAYROLL_GENERATE";
    pub const ATTENDANCE_APPROVE: &str = "ATTENDANCE_APPROVE";
    pub const REIMBURSEMENT_APPROVE: &str = "REIMBURSEMENT_APPROVE";
    pub const REIMBURSEMENT_REJECT: &str = "REIMBURSEMENT_REJECT";
    pub const REIMBURSEMENT_PAID: &str = "REIMBURSEMENT_PAID";
}
