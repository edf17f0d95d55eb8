use async_trait::async_trait;
use uuid::Uuid;

use super::PgStore;
use crate::database::{LoginAuditStore, RefreshTokenStore, StoreResult};
use crate::models::{NewLoginAudit, NewRefreshToken, RefreshToken};

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let stored = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at, device, ip)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, token_hash, user_id, expires_at, device, ip, is_revoked, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&token.token_hash)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(&token.device)
        .bind(&token.ip)
        .fetch_one(self.pool())
        .await?;
        Ok(stored)
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, token_hash, user_id, expires_at, device, ip, is_revoked, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(self.pool())
        .await?;
        Ok(token)
    }

    async fn revoke_if_active(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE WHERE token_hash = $1 AND NOT is_revoked",
        )
        .bind(token_hash)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl LoginAuditStore for PgStore {
    async fn append(&self, audit: NewLoginAudit) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_audits (id, user_id, email, ip, device, success)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(audit.user_id)
        .bind(&audit.email)
        .bind(&audit.meta.ip)
        .bind(&audit.meta.device)
        .bind(audit.success)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
