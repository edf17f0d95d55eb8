// 员工目录
// 创建、查询、修改、停用。用户从不物理删除。

use uuid::Uuid;

use super::authorization::{self, ADMIN_ONLY, PRIVILEGED};
use super::mailer::welcome_email;
use super::password_reset::validate_new_password;
use crate::AppState;
use crate::common::{PageRequest, PaginatedResponse};
use crate::database::StoreError;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, Role, User, UserFilter, UserUpdate};
use crate::utils::{generate_opaque_token, hash_password, is_valid_email, normalize_email};

const TEMP_PASSWORD_BYTES: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    /// 为空时生成临时密码
    pub password: Option<String>,
    pub role: Option<String>,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub send_email: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

pub fn parse_role(value: &str) -> AppResult<Role> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation("role must be ADMIN, MANAGER or EMPLOYEE".to_string()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn checked_email(email: &str) -> AppResult<String> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Valid email required".to_string()));
    }
    Ok(email)
}

fn email_taken(e: StoreError) -> AppError {
    match e {
        StoreError::UniqueViolation => AppError::Conflict("Email already registered".to_string()),
        other => other.into(),
    }
}

pub async fn create(state: &AppState, actor: &User, request: CreateUser) -> AppResult<User> {
    authorization::require_role(actor, ADMIN_ONLY)?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name required".to_string()));
    }
    let email = checked_email(&request.email)?;
    let role = match request.role.as_deref() {
        Some(role) => parse_role(role)?,
        None => Role::Employee,
    };
    let password = match request.password.filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_new_password(&password)?;
            password
        }
        None => generate_opaque_token(TEMP_PASSWORD_BYTES),
    };

    let password_hash = hash_password(&password, state.config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("hash password: {e}")))?;
    let user = state
        .repos
        .users
        .insert(NewUser {
            name,
            email,
            password_hash,
            role,
            employee_code: trimmed(request.employee_code),
            department: trimmed(request.department),
            designation: trimmed(request.designation),
        })
        .await
        .map_err(email_taken)?;

    if request.send_email {
        let (subject, html) = welcome_email(&user.email, &user.name, &password);
        if let Err(e) = state.mailer.send_email(&user.email, &subject, &html).await {
            tracing::warn!(user_id = %user.id, "Failed to send welcome email: {}", e);
        }
    }

    tracing::info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "User created");
    Ok(user)
}

pub async fn list(
    state: &AppState,
    actor: &User,
    filter: UserFilter,
    page: PageRequest,
) -> AppResult<PaginatedResponse<User>> {
    authorization::require_role(actor, PRIVILEGED)?;
    let (users, total) = state.repos.users.list(&filter, page).await?;
    Ok(PaginatedResponse::new(users, total, page))
}

pub async fn get(state: &AppState, actor: &User, user_id: Uuid) -> AppResult<User> {
    authorization::ensure_self_or_roles(actor, user_id, PRIVILEGED)?;
    state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// ADMIN 或本人可修改资料，角色和启用状态只有 ADMIN 能改
pub async fn update(
    state: &AppState,
    actor: &User,
    user_id: Uuid,
    request: UpdateUser,
) -> AppResult<User> {
    authorization::ensure_self_or_roles(actor, user_id, ADMIN_ONLY)?;

    let name = match request.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        other => trimmed(other),
    };
    let email = request.email.as_deref().map(checked_email).transpose()?;

    // 非 ADMIN 只能是改自己，忽略角色和启用状态
    let is_admin = actor.role == Role::Admin;
    let role = match request.role.as_deref() {
        Some(role) if is_admin => Some(parse_role(role)?),
        _ => None,
    };
    let is_active = request.is_active.filter(|_| is_admin);

    let update = UserUpdate {
        name,
        email,
        employee_code: trimmed(request.employee_code),
        department: trimmed(request.department),
        designation: trimmed(request.designation),
        role,
        is_active,
    };

    let user = state
        .repos
        .users
        .update(user_id, &update)
        .await
        .map_err(email_taken)?
        .ok_or(AppError::NotFound("User"))?;

    tracing::info!(user_id = %user.id, updated_by = %actor.id, "User updated");
    Ok(user)
}

pub async fn deactivate(state: &AppState, actor: &User, user_id: Uuid) -> AppResult<User> {
    authorization::require_role(actor, PRIVILEGED)?;

    let update = UserUpdate {
        is_active: Some(false),
        ..UserUpdate::default()
    };
    let user = state
        .repos
        .users
        .update(user_id, &update)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    tracing::info!(user_id = %user.id, deactivated_by = %actor.id, "User deactivated");
    Ok(user)
}
