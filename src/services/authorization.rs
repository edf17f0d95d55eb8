//! 权限检查
//!
//! 第一层按角色放行，第二层把 EMPLOYEE 的查询收窄到本人数据。

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Role, User};

pub const PRIVILEGED: &[Role] = &[Role::Admin, Role::Manager];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub fn require_role(actor: &User, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// EMPLOYEE 始终只能看自己，其他角色按请求的过滤条件
pub fn scope_employee(actor: &User, requested: Option<Uuid>) -> Option<Uuid> {
    match actor.role {
        Role::Employee => Some(actor.id),
        Role::Admin | Role::Manager => requested,
    }
}

/// 本人或指定角色才能访问
pub fn ensure_self_or_roles(actor: &User, owner: Uuid, roles: &[Role]) -> AppResult<()> {
    if actor.id == owner || roles.contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}
