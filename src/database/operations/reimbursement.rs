use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::common::PageRequest;
use crate::database::{ReimbursementStore, StoreResult};
use crate::models::{
    NewReimbursement, Receipt, Reimbursement, ReimbursementFilter, ReimbursementStatus,
    ReimbursementTransition,
};

const REIMBURSEMENT_COLUMNS: &str = r#"
    id, employee_id, amount, description, receipts, status, approved_by,
    approved_at, paid_at, rejection_reason, created_at, updated_at
"#;

/// 数据库行，票据以 JSONB 数组存储
#[derive(Debug, FromRow)]
struct ReimbursementRow {
    id: Uuid,
    employee_id: Uuid,
    amount: f64,
    description: Option<String>,
    receipts: Json<Vec<Receipt>>,
    #[sqlx(try_from = "String")]
    status: ReimbursementStatus,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReimbursementRow> for Reimbursement {
    fn from(row: ReimbursementRow) -> Self {
        Self {
            id: row.id,
            employee_id: row.employee_id,
            amount: row.amount,
            description: row.description,
            receipts: row.receipts.0,
            status: row.status,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            paid_at: row.paid_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_reimbursement_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReimbursementFilter) {
    qb.push(" WHERE TRUE");
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl ReimbursementStore for PgStore {
    async fn insert(&self, reimbursement: NewReimbursement) -> StoreResult<Reimbursement> {
        let sql = format!(
            r#"
            INSERT INTO reimbursements (id, employee_id, amount, description, receipts, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REIMBURSEMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ReimbursementRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(reimbursement.employee_id)
            .bind(reimbursement.amount)
            .bind(&reimbursement.description)
            .bind(Json(&reimbursement.receipts))
            .bind(ReimbursementStatus::Pending.as_str())
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reimbursement>> {
        let sql = format!("SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements WHERE id = $1");
        let row = sqlx::query_as::<_, ReimbursementRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Reimbursement::from))
    }

    async fn list(
        &self,
        filter: &ReimbursementFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Reimbursement>, u64)> {
        let mut rows_query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REIMBURSEMENT_COLUMNS} FROM reimbursements"
        ));
        push_reimbursement_filter(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reimbursements");
        push_reimbursement_filter(&mut count_query, filter);

        let (rows, total) = futures_util::try_join!(
            rows_query
                .build_query_as::<ReimbursementRow>()
                .fetch_all(self.pool()),
            count_query.build_query_scalar::<i64>().fetch_one(self.pool()),
        )?;

        Ok((
            rows.into_iter().map(Reimbursement::from).collect(),
            total.max(0) as u64,
        ))
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: &ReimbursementTransition,
    ) -> StoreResult<Option<Reimbursement>> {
        // 付款只记 paid_at，审批信息保持不变
        let sql = format!(
            r#"
            UPDATE reimbursements
            SET status = $2,
                approved_by = COALESCE($3, approved_by),
                approved_at = CASE WHEN $2 = 'Paid' THEN approved_at ELSE $4 END,
                paid_at = CASE WHEN $2 = 'Paid' THEN $4 ELSE paid_at END,
                rejection_reason = COALESCE($5, rejection_reason),
                updated_at = NOW()
            WHERE id = $1 AND status = $6
            RETURNING {REIMBURSEMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ReimbursementRow>(&sql)
            .bind(id)
            .bind(transition.to.as_str())
            .bind(transition.approved_by)
            .bind(transition.at)
            .bind(&transition.rejection_reason)
            .bind(transition.from.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Reimbursement::from))
    }
}
