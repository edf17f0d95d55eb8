use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::PgStore;
use crate::common::PageRequest;
use crate::database::{StoreResult, UserStore};
use crate::models::{NewUser, User, UserFilter, UserUpdate};

const USER_COLUMNS: &str = r#"
    id, name, email, password_hash, role, employee_code, department, designation,
    is_active, last_login, reset_token_hash, reset_token_expires_at, created_at, updated_at
"#;

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    qb.push(" WHERE is_active = ").push_bind(filter.active);

    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (");
        let mut fields = qb.separated(" OR ");
        for column in ["name", "email", "employee_code", "department", "designation"] {
            fields
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        qb.push(")");
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, employee_code, department, designation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.employee_code)
            .bind(&user.department)
            .bind(&user.designation)
            .fetch_one(self.pool())
            .await?;

        tracing::info!("Created user {} ({})", created.id, created.role);
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await?;
        Ok(users)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_token_hash = $1 AND reset_token_expires_at > $2"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let mut rows_query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filter(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut count_query, filter);

        let (users, total) = futures_util::try_join!(
            rows_query.build_query_as::<User>().fetch_all(self.pool()),
            count_query.build_query_scalar::<i64>().fetch_one(self.pool()),
        )?;

        Ok((users, total.max(0) as u64))
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                employee_code = COALESCE($4, employee_code),
                department = COALESCE($5, department),
                designation = COALESCE($6, designation),
                role = COALESCE($7, role),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.email)
            .bind(&update.employee_code)
            .bind(&update.department)
            .bind(&update.designation)
            .bind(update.role.map(|r| r.as_str()))
            .bind(update.is_active)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token_hash = $2, reset_token_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND reset_token_hash = $2 AND reset_token_expires_at > $4
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
