use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::common::PageRequest;
use crate::database::{LeaveStore, StoreResult};
use crate::models::{Leave, LeaveDecision, LeaveFilter, LeaveStatus, NewLeave};

const LEAVE_COLUMNS: &str = r#"
    id, employee_id, leave_type, from_date, to_date, reason, status, approved_by,
    approved_at, rejection_reason, conflict_detected, created_at, updated_at
"#;

fn push_leave_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &LeaveFilter) {
    qb.push(" WHERE TRUE");
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl LeaveStore for PgStore {
    async fn insert(&self, leave: NewLeave) -> StoreResult<Leave> {
        let sql = format!(
            r#"
            INSERT INTO leaves (id, employee_id, leave_type, from_date, to_date, reason, status, conflict_detected)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LEAVE_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Leave>(&sql)
            .bind(Uuid::new_v4())
            .bind(leave.employee_id)
            .bind(leave.leave_type.as_str())
            .bind(leave.from_date)
            .bind(leave.to_date)
            .bind(&leave.reason)
            .bind(LeaveStatus::Pending.as_str())
            .bind(leave.conflict_detected)
            .fetch_one(self.pool())
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Leave>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leaves WHERE id = $1");
        let leave = sqlx::query_as::<_, Leave>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(leave)
    }

    async fn find_approved(
        &self,
        employee_id: Uuid,
        exclude: Option<Uuid>,
    ) -> StoreResult<Vec<Leave>> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS} FROM leaves
            WHERE employee_id = $1 AND status = $2 AND ($3::uuid IS NULL OR id <> $3)
            "#
        );
        let leaves = sqlx::query_as::<_, Leave>(&sql)
            .bind(employee_id)
            .bind(LeaveStatus::Approved.as_str())
            .bind(exclude)
            .fetch_all(self.pool())
            .await?;
        Ok(leaves)
    }

    async fn find_approved_within(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Leave>> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS} FROM leaves
            WHERE employee_id = $1 AND status = $2 AND from_date >= $3 AND to_date <= $4
            "#
        );
        let leaves = sqlx::query_as::<_, Leave>(&sql)
            .bind(employee_id)
            .bind(LeaveStatus::Approved.as_str())
            .bind(start)
            .bind(end)
            .fetch_all(self.pool())
            .await?;
        Ok(leaves)
    }

    async fn list(
        &self,
        filter: &LeaveFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Leave>, u64)> {
        let mut rows_query =
            QueryBuilder::<Postgres>::new(format!("SELECT {LEAVE_COLUMNS} FROM leaves"));
        push_leave_filter(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leaves");
        push_leave_filter(&mut count_query, filter);

        let (leaves, total) = futures_util::try_join!(
            rows_query.build_query_as::<Leave>().fetch_all(self.pool()),
            count_query.build_query_scalar::<i64>().fetch_one(self.pool()),
        )?;

        Ok((leaves, total.max(0) as u64))
    }

    async fn decide(&self, id: Uuid, decision: &LeaveDecision) -> StoreResult<Option<Leave>> {
        let sql = format!(
            r#"
            UPDATE leaves
            SET status = $2,
                approved_by = $3,
                approved_at = $4,
                rejection_reason = $5,
                conflict_detected = $6,
                updated_at = NOW()
            WHERE id = $1 AND status = $7
            RETURNING {LEAVE_COLUMNS}
            "#
        );

        let leave = sqlx::query_as::<_, Leave>(&sql)
            .bind(id)
            .bind(decision.status.as_str())
            .bind(decision.approved_by)
            .bind(decision.approved_at)
            .bind(&decision.rejection_reason)
            .bind(decision.conflict_detected)
            .bind(LeaveStatus::Pending.as_str())
            .fetch_optional(self.pool())
            .await?;
        Ok(leave)
    }
}
