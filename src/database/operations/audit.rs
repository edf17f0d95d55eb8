use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::PgStore;
use crate::database::{AuditLogStore, StoreResult};
use crate::models::AuditEntry;

#[async_trait]
impl AuditLogStore for PgStore {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, action, performed_by, target, target_id, details, ip, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.action)
        .bind(entry.performed_by)
        .bind(entry.target)
        .bind(&entry.target_id)
        .bind(entry.details.map(Json))
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
