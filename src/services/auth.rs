// 登录与登出

use chrono::Utc;

use super::token::{self, SessionTokens};
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ClientMeta, NewLoginAudit, User};
use crate::utils::{normalize_email, verify_password};

/// 写登录审计，失败只记日志
async fn record_attempt(
    state: &AppState,
    user_id: Option<uuid::Uuid>,
    email: &str,
    meta: &ClientMeta,
    success: bool,
) {
    let audit = NewLoginAudit {
        user_id,
        email: email.to_string(),
        meta: meta.clone(),
        success,
    };
    if let Err(e) = state.repos.login_audits.append(audit).await {
        tracing::warn!("Failed to write login audit for {}: {}", email, e);
    }
}

/// 校验邮箱密码并签发会话
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    meta: &ClientMeta,
) -> AppResult<(SessionTokens, User)> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password required".to_string(),
        ));
    }

    let Some(user) = state.repos.users.find_by_email(&email).await? else {
        record_attempt(state, None, &email, meta, false).await;
        return Err(AppError::InvalidCredentials);
    };

    if !user.is_active {
        record_attempt(state, Some(user.id), &email, meta, false).await;
        return Err(AppError::AccountInactive);
    }

    let matched = verify_password(password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("verify password: {e}")))?;
    if !matched {
        record_attempt(state, Some(user.id), &email, meta, false).await;
        return Err(AppError::InvalidCredentials);
    }

    let now = Utc::now();
    state.repos.users.record_login(user.id, now).await?;
    record_attempt(state, Some(user.id), &email, meta, true).await;

    let tokens = token::issue_session(state, &user, meta).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        tokens,
        User {
            last_login: Some(now),
            ..user
        },
    ))
}

/// 登出，令牌缺失或无效都视为成功
pub async fn logout(state: &AppState, refresh_token: Option<&str>) {
    if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
        token::revoke(state, token).await;
    }
}
