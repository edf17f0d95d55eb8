// 业务服务
// 处理器只做参数解析和响应包装，业务规则都在这里

pub mod attendance;
pub mod audit;
pub mod auth;
pub mod authorization;
pub mod document;
pub mod leave;
pub mod mailer;
pub mod password_reset;
pub mod payroll;
pub mod reimbursement;
pub mod token;
pub mod user;
