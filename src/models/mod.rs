// 领域模型
// 与存储无关的值对象，由存储层加载、由服务层使用

pub mod attendance;
pub mod audit;
pub mod leave;
pub mod payroll;
pub mod reimbursement;
pub mod session;
pub mod user;

pub use attendance::{Attendance, AttendanceFilter, AttendanceView, NewAttendance};
pub use audit::AuditEntry;
pub use leave::{Leave, LeaveBalance, LeaveDecision, LeaveFilter, LeaveStatus, LeaveType, LeaveView, NewLeave};
pub use payroll::{NewPayroll, Payroll, PayrollFilter, PayrollView, SalaryItems, YtdSummary};
pub use reimbursement::{
    NewReimbursement, Receipt, Reimbursement, ReimbursementFilter, ReimbursementStatus,
    ReimbursementTransition, ReimbursementView,
};
pub use session::{ClientMeta, LoginAudit, NewLoginAudit, NewRefreshToken, RefreshToken};
pub use user::{NewUser, Role, User, UserFilter, UserSummary, UserUpdate};

/// 数据库里的枚举文本无法识别
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
