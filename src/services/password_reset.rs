//! 找回密码
//!
//! 无论邮箱是否存在都返回同一条消息。重置令牌只以 SHA-256 入库，
//! 使用后立即清空，同一令牌只能成功一次。

use chrono::Utc;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::utils::{generate_opaque_token, hash_password, normalize_email, sha256_hex};

use super::mailer::password_reset_email;
use super::token::expires_after;

pub const RESET_REQUESTED_MESSAGE: &str = "If the email exists, a reset link will be sent.";
pub const RESET_COMPLETED_MESSAGE: &str = "Password reset successful.";
pub const MIN_PASSWORD_LEN: usize = 6;

const RESET_TOKEN_BYTES: usize = 32;

pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn request_reset(state: &AppState, email: &str) -> AppResult<&'static str> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::Validation("Email required".to_string()));
    }

    let Some(user) = state.repos.users.find_by_email(&email).await? else {
        return Ok(RESET_REQUESTED_MESSAGE);
    };

    let token = generate_opaque_token(RESET_TOKEN_BYTES);
    let ttl = state.config.password_reset_ttl();
    let expires_at = expires_after(Utc::now(), ttl);
    state
        .repos
        .users
        .set_reset_token(user.id, &sha256_hex(&token), expires_at)
        .await?;

    let link = format!(
        "{}/reset-password?token={}",
        state.config.frontend_url.trim_end_matches('/'),
        token
    );
    let (subject, html) = password_reset_email(&link, ttl.as_secs() / 60);
    if let Err(e) = state.mailer.send_email(&user.email, &subject, &html).await {
        tracing::warn!(user_id = %user.id, "Failed to send password reset email: {}", e);
    }

    Ok(RESET_REQUESTED_MESSAGE)
}

pub async fn consume_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> AppResult<&'static str> {
    if token.is_empty() || new_password.is_empty() {
        return Err(AppError::Validation(
            "Token and new password required".to_string(),
        ));
    }
    validate_new_password(new_password)?;

    let token_hash = sha256_hex(token);
    let now = Utc::now();
    let user = state
        .repos
        .users
        .find_by_reset_token(&token_hash, now)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    let password_hash = hash_password(new_password, state.config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("hash password: {e}")))?;

    let applied = state
        .repos
        .users
        .complete_password_reset(user.id, &token_hash, &password_hash, now)
        .await?;
    if !applied {
        return Err(AppError::InvalidOrExpiredToken);
    }

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(RESET_COMPLETED_MESSAGE)
}
