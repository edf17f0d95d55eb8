use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::common::PageRequest;
use crate::database::{AttendanceStore, StoreResult};
use crate::models::{Attendance, AttendanceFilter, NewAttendance};

const ATTENDANCE_COLUMNS: &str = r#"
    id, employee_id, date, clock_in, clock_out, location, ip, overtime_minutes,
    approved_by, approved_at, created_at, updated_at
"#;

fn push_attendance_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AttendanceFilter) {
    qb.push(" WHERE TRUE");
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(from) = filter.from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND date <= ").push_bind(to);
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn insert(&self, attendance: NewAttendance) -> StoreResult<Attendance> {
        let sql = format!(
            r#"
            INSERT INTO attendance (id, employee_id, date, clock_in, location, ip)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Attendance>(&sql)
            .bind(Uuid::new_v4())
            .bind(attendance.employee_id)
            .bind(attendance.date)
            .bind(attendance.clock_in)
            .bind(&attendance.location)
            .bind(&attendance.ip)
            .fetch_one(self.pool())
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Attendance>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = $1");
        let attendance = sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(attendance)
    }

    async fn find_for_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Attendance>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = $1 AND date = $2"
        );
        let attendance = sqlx::query_as::<_, Attendance>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(self.pool())
            .await?;
        Ok(attendance)
    }

    async fn clock_out(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        overtime_minutes: i32,
    ) -> StoreResult<Option<Attendance>> {
        let sql = format!(
            r#"
            UPDATE attendance
            SET clock_out = $2, overtime_minutes = $3, updated_at = NOW()
            WHERE id = $1 AND clock_out IS NULL
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        );
        let attendance = sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .bind(at)
            .bind(overtime_minutes)
            .fetch_optional(self.pool())
            .await?;
        Ok(attendance)
    }

    async fn list(
        &self,
        filter: &AttendanceFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Attendance>, u64)> {
        let mut rows_query =
            QueryBuilder::<Postgres>::new(format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance"));
        push_attendance_filter(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY date DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM attendance");
        push_attendance_filter(&mut count_query, filter);

        let (rows, total) = futures_util::try_join!(
            rows_query.build_query_as::<Attendance>().fetch_all(self.pool()),
            count_query.build_query_scalar::<i64>().fetch_one(self.pool()),
        )?;

        Ok((rows, total.max(0) as u64))
    }

    async fn approve(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Attendance>> {
        let sql = format!(
            r#"
            UPDATE attendance
            SET approved_by = $2, approved_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        );
        let attendance = sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .bind(approved_by)
            .bind(at)
            .fetch_optional(self.pool())
            .await?;
        Ok(attendance)
    }
}
