use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::common::PageRequest;
use crate::database::{PayrollStore, StoreResult};
use crate::models::{NewPayroll, Payroll, PayrollFilter, SalaryItems};

const PAYROLL_COLUMNS: &str = r#"
    id, employee_id, month, year, basic_salary, allowances, deductions,
    gross_salary, net_salary, currency, document_path, created_at
"#;

/// 数据库行，明细以 JSONB 存储
#[derive(Debug, FromRow)]
struct PayrollRow {
    id: Uuid,
    employee_id: Uuid,
    month: i32,
    year: i32,
    basic_salary: f64,
    allowances: Json<SalaryItems>,
    deductions: Json<SalaryItems>,
    gross_salary: f64,
    net_salary: f64,
    currency: String,
    document_path: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PayrollRow> for Payroll {
    fn from(row: PayrollRow) -> Self {
        Self {
            id: row.id,
            employee_id: row.employee_id,
            month: row.month,
            year: row.year,
            basic_salary: row.basic_salary,
            allowances: row.allowances.0,
            deductions: row.deductions.0,
            gross_salary: row.gross_salary,
            net_salary: row.net_salary,
            currency: row.currency,
            document_path: row.document_path,
            created_at: row.created_at,
        }
    }
}

fn push_payroll_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PayrollFilter) {
    qb.push(" WHERE TRUE");
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(month) = filter.month {
        qb.push(" AND month = ").push_bind(month);
    }
    if let Some(year) = filter.year {
        qb.push(" AND year = ").push_bind(year);
    }
}

#[async_trait]
impl PayrollStore for PgStore {
    async fn insert(&self, payroll: NewPayroll) -> StoreResult<Payroll> {
        let sql = format!(
            r#"
            INSERT INTO payrolls (
                id, employee_id, month, year, basic_salary, allowances, deductions,
                gross_salary, net_salary, currency
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PAYROLL_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(payroll.employee_id)
            .bind(payroll.month)
            .bind(payroll.year)
            .bind(payroll.basic_salary)
            .bind(Json(&payroll.allowances))
            .bind(Json(&payroll.deductions))
            .bind(payroll.gross_salary)
            .bind(payroll.net_salary)
            .bind(&payroll.currency)
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payroll>> {
        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE id = $1");
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Payroll::from))
    }

    async fn find_by_period(
        &self,
        employee_id: Uuid,
        month: i32,
        year: i32,
    ) -> StoreResult<Option<Payroll>> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE employee_id = $1 AND month = $2 AND year = $3"
        );
        let row = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .bind(month)
            .bind(year)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Payroll::from))
    }

    async fn set_document_path(&self, id: Uuid, path: &str) -> StoreResult<()> {
        sqlx::query("UPDATE payrolls SET document_path = $2 WHERE id = $1")
            .bind(id)
            .bind(path)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &PayrollFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payroll>, u64)> {
        let mut rows_query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PAYROLL_COLUMNS} FROM payrolls"));
        push_payroll_filter(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM payrolls");
        push_payroll_filter(&mut count_query, filter);

        let (rows, total) = futures_util::try_join!(
            rows_query.build_query_as::<PayrollRow>().fetch_all(self.pool()),
            count_query.build_query_scalar::<i64>().fetch_one(self.pool()),
        )?;

        Ok((
            rows.into_iter().map(Payroll::from).collect(),
            total.max(0) as u64,
        ))
    }

    async fn list_for_year(&self, employee_id: Uuid, year: i32) -> StoreResult<Vec<Payroll>> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE employee_id = $1 AND year = $2 ORDER BY month"
        );
        let rows = sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(employee_id)
            .bind(year)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Payroll::from).collect())
    }
}
