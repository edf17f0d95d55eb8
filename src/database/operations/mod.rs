// Postgres 存储实现
// 每个实体一个文件，统一挂在 PgStore 上

mod attendance;
mod audit;
mod leave;
mod payroll;
mod reimbursement;
mod session;
mod user;

use sqlx::PgPool;

/// 基于 Postgres 连接池的存储实现
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
