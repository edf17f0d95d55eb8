use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 请求来源，用于刷新令牌和登录审计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub device: Option<String>,
}

/// 刷新令牌记录
///
/// 只保存令牌的 SHA-256，明文只在签发时返回给客户端一次。
/// 状态只会从有效变成已吊销，不会恢复。
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub device: Option<String>,
    pub ip: Option<String>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub device: Option<String>,
    pub ip: Option<String>,
}

/// 登录审计，只追加
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginAudit {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub ip: Option<String>,
    pub device: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLoginAudit {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub meta: ClientMeta,
    pub success: bool,
}
