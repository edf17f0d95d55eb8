// 数据库模块
// 存储接口定义，以及 Postgres 实现

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use crate::common::PageRequest;
use crate::models::{
    Attendance, AttendanceFilter, AuditEntry, Leave, LeaveDecision, LeaveFilter, NewAttendance,
    NewLeave, NewLoginAudit, NewPayroll, NewRefreshToken, NewReimbursement, NewUser, Payroll,
    PayrollFilter, RefreshToken, Reimbursement, ReimbursementFilter, ReimbursementTransition, User,
    UserFilter, UserUpdate,
};

#[cfg(test)]
pub mod memory;
pub mod operations;
pub mod seed;

pub use operations::PgStore;

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 唯一约束冲突
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            _ => StoreError::Sqlx(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 建立连接池并执行迁移
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'workforce';").await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// 邮箱重复时返回 [`StoreError::UniqueViolation`]
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// 查找重置令牌哈希匹配且未过期的用户
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)>;

    async fn update(&self, id: Uuid, update: &UserUpdate) -> StoreResult<Option<User>>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// 原子地替换密码并清空重置令牌，前提是令牌哈希仍匹配且未过期。
    /// 返回 false 表示令牌已被使用或已过期。
    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// 条件吊销：仅当令牌仍有效时置为已吊销，返回是否由本次调用完成
    async fn revoke_if_active(&self, token_hash: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait LoginAuditStore: Send + Sync {
    async fn append(&self, audit: NewLoginAudit) -> StoreResult<()>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn insert(&self, leave: NewLeave) -> StoreResult<Leave>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Leave>>;

    /// 员工所有已批准的假期，可排除一条
    async fn find_approved(
        &self,
        employee_id: Uuid,
        exclude: Option<Uuid>,
    ) -> StoreResult<Vec<Leave>>;

    /// 完全落在 `[start, end]` 内的已批准假期
    async fn find_approved_within(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Leave>>;

    async fn list(&self, filter: &LeaveFilter, page: PageRequest)
    -> StoreResult<(Vec<Leave>, u64)>;

    /// 仅当状态仍为 Pending 时写入审批结果，否则返回 None
    async fn decide(&self, id: Uuid, decision: &LeaveDecision) -> StoreResult<Option<Leave>>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    /// (员工, 月, 年) 重复时返回 [`StoreError::UniqueViolation`]
    async fn insert(&self, payroll: NewPayroll) -> StoreResult<Payroll>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payroll>>;

    async fn find_by_period(
        &self,
        employee_id: Uuid,
        month: i32,
        year: i32,
    ) -> StoreResult<Option<Payroll>>;

    async fn set_document_path(&self, id: Uuid, path: &str) -> StoreResult<()>;

    async fn list(
        &self,
        filter: &PayrollFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payroll>, u64)>;

    async fn list_for_year(&self, employee_id: Uuid, year: i32) -> StoreResult<Vec<Payroll>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// 同一员工同一天已有记录时返回 [`StoreError::UniqueViolation`]
    async fn insert(&self, attendance: NewAttendance) -> StoreResult<Attendance>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Attendance>>;

    async fn find_for_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Attendance>>;

    /// 仅当尚未下班打卡时写入，否则返回 None
    async fn clock_out(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        overtime_minutes: i32,
    ) -> StoreResult<Option<Attendance>>;

    async fn list(
        &self,
        filter: &AttendanceFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Attendance>, u64)>;

    async fn approve(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Attendance>>;
}

#[async_trait]
pub trait ReimbursementStore: Send + Sync {
    async fn insert(&self, reimbursement: NewReimbursement) -> StoreResult<Reimbursement>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reimbursement>>;

    async fn list(
        &self,
        filter: &ReimbursementFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Reimbursement>, u64)>;

    /// 仅当状态仍为 `transition.from` 时写入，否则返回 None
    async fn transition(
        &self,
        id: Uuid,
        transition: &ReimbursementTransition,
    ) -> StoreResult<Option<Reimbursement>>;
}

/// 审计日志写入口，由处理器在业务成功后调用
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()>;
}

/// 所有存储句柄
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub login_audits: Arc<dyn LoginAuditStore>,
    pub leaves: Arc<dyn LeaveStore>,
    pub payrolls: Arc<dyn PayrollStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub reimbursements: Arc<dyn ReimbursementStore>,
    pub audit_logs: Arc<dyn AuditLogStore>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    /// 同一个实现同时充当所有存储
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserStore
            + RefreshTokenStore
            + LoginAuditStore
            + LeaveStore
            + PayrollStore
            + AttendanceStore
            + ReimbursementStore
            + AuditLogStore
            + 'static,
    {
        Self {
            users: store.clone(),
            refresh_tokens: store.clone(),
            login_audits: store.clone(),
            leaves: store.clone(),
            payrolls: store.clone(),
            attendance: store.clone(),
            reimbursements: store.clone(),
            audit_logs: store,
        }
    }
}
