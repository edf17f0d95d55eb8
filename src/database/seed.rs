// 初始数据
// 管理员、人事经理、两名员工，以及一条待审批的请假

use chrono::{Duration, Utc};

use super::Repositories;
use crate::error::{AppError, AppResult};
use crate::models::{LeaveType, NewLeave, NewUser, Role};
use crate::utils::hash_password;

pub const ADMIN_EMAIL: &str = "admin@company.com";

struct SeedUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
    employee_code: &'static str,
    department: &'static str,
    designation: &'static str,
}

const SEED_USERS: [SeedUser; 4] = [
    SeedUser {
        name: "Admin User",
        email: ADMIN_EMAIL,
        password: "Admin@123",
        role: Role::Admin,
        employee_code: "EMP001",
        department: "IT",
        designation: "System Administrator",
    },
    SeedUser {
        name: "HR Manager",
        email: "hr@company.com",
        password: "Manager@123",
        role: Role::Manager,
        employee_code: "EMP002",
        department: "HR",
        designation: "HR Manager",
    },
    SeedUser {
        name: "John Doe",
        email: "john@company.com",
        password: "Employee@123",
        role: Role::Employee,
        employee_code: "EMP003",
        department: "Engineering",
        designation: "Software Engineer",
    },
    SeedUser {
        name: "Jane Smith",
        email: "jane@company.com",
        password: "Employee@123",
        role: Role::Employee,
        employee_code: "EMP004",
        department: "Engineering",
        designation: "Senior Developer",
    },
];

/// 补齐缺失的初始用户，已存在的按邮箱跳过；没有新写入时返回 false
pub async fn run(repos: &Repositories, bcrypt_cost: u32) -> AppResult<bool> {
    let mut created = Vec::with_capacity(SEED_USERS.len());
    for seed in &SEED_USERS {
        if repos.users.find_by_email(seed.email).await?.is_some() {
            continue;
        }
        let password_hash = hash_password(seed.password, bcrypt_cost)
            .map_err(|e| AppError::Internal(format!("hash seed password: {e}")))?;
        let user = repos
            .users
            .insert(NewUser {
                name: seed.name.to_string(),
                email: seed.email.to_string(),
                password_hash,
                role: seed.role,
                employee_code: Some(seed.employee_code.to_string()),
                department: Some(seed.department.to_string()),
                designation: Some(seed.designation.to_string()),
            })
            .await?;
        created.push(user);
    }

    if created.is_empty() {
        tracing::info!("Seed already applied, all seed users exist");
        return Ok(false);
    }

    // John 下周的事假，只在本次新建 John 时写入
    if let Some(john) = created.iter().find(|u| u.email == "john@company.com") {
        let today = Utc::now().date_naive();
        repos
            .leaves
            .insert(NewLeave {
                employee_id: john.id,
                leave_type: LeaveType::Casual,
                from_date: today + Duration::days(7),
                to_date: today + Duration::days(8),
                reason: Some("Personal".to_string()),
                conflict_detected: false,
            })
            .await?;
    }

    tracing::info!("Seed completed: {} users created", created.len());
    Ok(true)
}
