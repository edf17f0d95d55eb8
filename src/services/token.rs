//! 令牌服务
//!
//! 访问令牌是 HS256 JWT，只校验签名和过期时间，不查库。
//! 刷新令牌是 40 字节随机数的十六进制串，库里只存 SHA-256；
//! 每次刷新都吊销旧令牌并签发新的一对，旧令牌永久失效。

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{ClientMeta, NewRefreshToken, Role, User};
use crate::utils::{generate_opaque_token, sha256_hex};

const REFRESH_TOKEN_BYTES: usize = 40;

/// 访问令牌载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 用户 ID
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// 登录或刷新后返回给客户端的令牌对
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    /// 访问令牌剩余秒数
    pub expires_in: u64,
}

/// `now + duration`，溢出时取可表示的最大时间
pub fn expires_after(now: DateTime<Utc>, duration: std::time::Duration) -> DateTime<Utc> {
    i64::try_from(duration.as_secs())
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn generate_access_token(user: &User, config: &Config) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = expires_after(now, config.access_token_ttl());

    let claims = AccessClaims {
        sub: user.id.to_string(),
        role: user.role,
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("sign access token: {e}")))?;

    Ok((token, expires_at))
}

pub fn decode_access_token(token: &str, config: &Config) -> AppResult<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["sub", "exp"]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::TokenInvalid,
    })
}

/// 签发访问令牌和刷新令牌
pub async fn issue_session(
    state: &AppState,
    user: &User,
    meta: &ClientMeta,
) -> AppResult<SessionTokens> {
    let (access_token, access_expires_at) = generate_access_token(user, &state.config)?;

    let refresh_token = generate_opaque_token(REFRESH_TOKEN_BYTES);
    state
        .repos
        .refresh_tokens
        .insert(NewRefreshToken {
            token_hash: sha256_hex(&refresh_token),
            user_id: user.id,
            expires_at: expires_after(Utc::now(), state.config.refresh_token_ttl()),
            device: meta.device.clone(),
            ip: meta.ip.clone(),
        })
        .await?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
        access_expires_at,
        expires_in: state.config.access_token_ttl().as_secs(),
    })
}

/// 校验访问令牌并加载当前用户
pub async fn validate_access(state: &AppState, token: &str) -> AppResult<User> {
    let claims = decode_access_token(token, &state.config)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?;

    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if !user.is_active {
        return Err(AppError::AccountInactive);
    }
    Ok(user)
}

/// 用刷新令牌换一对新令牌
///
/// 旧令牌通过条件更新吊销，并发刷新时只有一个请求能成功。
pub async fn rotate_refresh(
    state: &AppState,
    refresh_token: &str,
    meta: &ClientMeta,
) -> AppResult<(SessionTokens, User)> {
    let token_hash = sha256_hex(refresh_token);
    let stored = state
        .repos
        .refresh_tokens
        .find_by_hash(&token_hash)
        .await?
        .filter(|t| !t.is_revoked)
        .ok_or(AppError::InvalidToken)?;

    if stored.is_expired(Utc::now()) {
        state
            .repos
            .refresh_tokens
            .revoke_if_active(&token_hash)
            .await?;
        return Err(AppError::TokenExpired);
    }

    let user = state
        .repos
        .users
        .find_by_id(stored.user_id)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if !user.is_active {
        return Err(AppError::AccountInactive);
    }

    if !state
        .repos
        .refresh_tokens
        .revoke_if_active(&token_hash)
        .await?
    {
        tracing::warn!(user_id = %user.id, "Refresh token redeemed concurrently");
        return Err(AppError::InvalidToken);
    }

    let tokens = issue_session(state, &user, meta).await?;
    Ok((tokens, user))
}

/// 吊销刷新令牌，重复调用或令牌不存在都不报错
pub async fn revoke(state: &AppState, refresh_token: &str) {
    if let Err(e) = state
        .repos
        .refresh_tokens
        .revoke_if_active(&sha256_hex(refresh_token))
        .await
    {
        tracing::warn!("Failed to revoke refresh token: {}", e);
    }
}
