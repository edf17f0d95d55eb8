//! 内存存储，仅供测试使用
//!
//! 与 Postgres 实现保持相同的约束：邮箱唯一、工资单 (员工, 月, 年) 唯一、
//! 刷新令牌条件吊销、请假条件审批、考勤 (员工, 日期) 唯一、报销条件流转。

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{
    AttendanceStore, AuditLogStore, LeaveStore, LoginAuditStore, PayrollStore, RefreshTokenStore,
    ReimbursementStore, StoreError, StoreResult, UserStore,
};
use crate::common::PageRequest;
use crate::models::{
    Attendance, AttendanceFilter, AuditEntry, Leave, LeaveDecision, LeaveFilter, LeaveStatus,
    LoginAudit, NewAttendance, NewLeave, NewLoginAudit, NewPayroll, NewRefreshToken,
    NewReimbursement, NewUser, Payroll, PayrollFilter, RefreshToken, Reimbursement,
    ReimbursementFilter, ReimbursementStatus, ReimbursementTransition, User, UserFilter,
    UserUpdate,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    refresh_tokens: Vec<RefreshToken>,
    login_audits: Vec<LoginAudit>,
    leaves: Vec<Leave>,
    payrolls: Vec<Payroll>,
    attendance: Vec<Attendance>,
    reimbursements: Vec<Reimbursement>,
    audit_logs: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

/// 按创建时间倒序分页
fn paginate<T: Clone>(mut items: Vec<T>, page: PageRequest) -> (Vec<T>, u64) {
    items.reverse();
    let total = items.len() as u64;
    let page_items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (page_items, total)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_tokens(&self) -> Vec<RefreshToken> {
        self.tables.lock().unwrap().refresh_tokens.clone()
    }

    pub fn login_audits(&self) -> Vec<LoginAudit> {
        self.tables.lock().unwrap().login_audits.clone()
    }

    pub fn audit_logs(&self) -> Vec<AuditEntry> {
        self.tables.lock().unwrap().audit_logs.clone()
    }

    pub fn payroll_count(&self) -> usize {
        self.tables.lock().unwrap().payrolls.len()
    }

    /// 把刷新令牌的过期时间改到过去
    pub fn expire_refresh_token(&self, token_hash: &str) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(token) = tables
            .refresh_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash)
        {
            token.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
    }

    /// 把用户的重置令牌过期时间改到过去
    pub fn expire_reset_token(&self, user_id: Uuid) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) {
            user.reset_token_expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        }
    }

    /// 直接写入一条请假记录，用于构造已批准的假期
    pub fn put_leave(&self, leave: Leave) {
        self.tables.lock().unwrap().leaves.push(leave);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            employee_code: user.employee_code,
            department: user.department,
            designation: user.designation,
            is_active: true,
            last_login: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .find(|u| {
                u.reset_token_hash.as_deref() == Some(token_hash)
                    && u.reset_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn list(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<User>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matched = tables
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(paginate(matched, page))
    }

    async fn update(&self, id: Uuid, update: &UserUpdate) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(email) = &update.email {
            if tables.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::UniqueViolation);
            }
        }
        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(code) = &update.employee_code {
            user.employee_code = Some(code.clone());
        }
        if let Some(department) = &update.department {
            user.department = Some(department.clone());
        }
        if let Some(designation) = &update.designation {
            user.designation = Some(designation.clone());
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let Some(user) = tables.users.iter_mut().find(|u| {
            u.id == id
                && u.reset_token_hash.as_deref() == Some(token_hash)
                && u.reset_token_expires_at.is_some_and(|exp| exp > now)
        }) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        Ok(true)
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .refresh_tokens
            .iter()
            .any(|t| t.token_hash == token.token_hash)
        {
            return Err(StoreError::UniqueViolation);
        }
        let stored = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: token.token_hash,
            user_id: token.user_id,
            expires_at: token.expires_at,
            device: token.device,
            ip: token.ip,
            is_revoked: false,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_if_active(&self, token_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .refresh_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && !t.is_revoked)
        {
            Some(token) => {
                token.is_revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LoginAuditStore for MemoryStore {
    async fn append(&self, audit: NewLoginAudit) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.login_audits.push(LoginAudit {
            id: Uuid::new_v4(),
            user_id: audit.user_id,
            email: audit.email,
            ip: audit.meta.ip,
            device: audit.meta.device,
            success: audit.success,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MemoryStore {
    async fn insert(&self, leave: NewLeave) -> StoreResult<Leave> {
        let now = Utc::now();
        let created = Leave {
            id: Uuid::new_v4(),
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            from_date: leave.from_date,
            to_date: leave.to_date,
            reason: leave.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            conflict_detected: leave.conflict_detected,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().leaves.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Leave>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.leaves.iter().find(|l| l.id == id).cloned())
    }

    async fn find_approved(
        &self,
        employee_id: Uuid,
        exclude: Option<Uuid>,
    ) -> StoreResult<Vec<Leave>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .leaves
            .iter()
            .filter(|l| {
                l.employee_id == employee_id
                    && l.status == LeaveStatus::Approved
                    && Some(l.id) != exclude
            })
            .cloned()
            .collect())
    }

    async fn find_approved_within(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Leave>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .leaves
            .iter()
            .filter(|l| {
                l.employee_id == employee_id
                    && l.status == LeaveStatus::Approved
                    && l.from_date >= start
                    && l.to_date <= end
            })
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        filter: &LeaveFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Leave>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matched = tables
            .leaves
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        Ok(paginate(matched, page))
    }

    async fn decide(&self, id: Uuid, decision: &LeaveDecision) -> StoreResult<Option<Leave>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(leave) = tables
            .leaves
            .iter_mut()
            .find(|l| l.id == id && l.status == LeaveStatus::Pending)
        else {
            return Ok(None);
        };
        leave.status = decision.status;
        leave.approved_by = Some(decision.approved_by);
        leave.approved_at = Some(decision.approved_at);
        leave.rejection_reason = decision.rejection_reason.clone();
        leave.conflict_detected = decision.conflict_detected;
        leave.updated_at = Utc::now();
        Ok(Some(leave.clone()))
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn insert(&self, payroll: NewPayroll) -> StoreResult<Payroll> {
        let mut tables = self.tables.lock().unwrap();
        if tables.payrolls.iter().any(|p| {
            p.employee_id == payroll.employee_id && p.month == payroll.month && p.year == payroll.year
        }) {
            return Err(StoreError::UniqueViolation);
        }
        let created = Payroll {
            id: Uuid::new_v4(),
            employee_id: payroll.employee_id,
            month: payroll.month,
            year: payroll.year,
            basic_salary: payroll.basic_salary,
            allowances: payroll.allowances,
            deductions: payroll.deductions,
            gross_salary: payroll.gross_salary,
            net_salary: payroll.net_salary,
            currency: payroll.currency,
            document_path: None,
            created_at: Utc::now(),
        };
        tables.payrolls.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Payroll>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.payrolls.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_period(
        &self,
        employee_id: Uuid,
        month: i32,
        year: i32,
    ) -> StoreResult<Option<Payroll>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payrolls
            .iter()
            .find(|p| p.employee_id == employee_id && p.month == month && p.year == year)
            .cloned())
    }

    async fn set_document_path(&self, id: Uuid, path: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(payroll) = tables.payrolls.iter_mut().find(|p| p.id == id) {
            payroll.document_path = Some(path.to_string());
        }
        Ok(())
    }

    async fn list(
        &self,
        filter: &PayrollFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Payroll>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matched = tables
            .payrolls
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(paginate(matched, page))
    }

    async fn list_for_year(&self, employee_id: Uuid, year: i32) -> StoreResult<Vec<Payroll>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .payrolls
            .iter()
            .filter(|p| p.employee_id == employee_id && p.year == year)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert(&self, attendance: NewAttendance) -> StoreResult<Attendance> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .attendance
            .iter()
            .any(|a| a.employee_id == attendance.employee_id && a.date == attendance.date)
        {
            return Err(StoreError::UniqueViolation);
        }
        let now = Utc::now();
        let created = Attendance {
            id: Uuid::new_v4(),
            employee_id: attendance.employee_id,
            date: attendance.date,
            clock_in: attendance.clock_in,
            clock_out: None,
            location: attendance.location,
            ip: attendance.ip,
            overtime_minutes: 0,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.attendance.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Attendance>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.attendance.iter().find(|a| a.id == id).cloned())
    }

    async fn find_for_day(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<Attendance>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attendance
            .iter()
            .find(|a| a.employee_id == employee_id && a.date == date)
            .cloned())
    }

    async fn clock_out(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        overtime_minutes: i32,
    ) -> StoreResult<Option<Attendance>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(attendance) = tables
            .attendance
            .iter_mut()
            .find(|a| a.id == id && a.clock_out.is_none())
        else {
            return Ok(None);
        };
        attendance.clock_out = Some(at);
        attendance.overtime_minutes = overtime_minutes;
        attendance.updated_at = Utc::now();
        Ok(Some(attendance.clone()))
    }

    async fn list(
        &self,
        filter: &AttendanceFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Attendance>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matched = tables
            .attendance
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(paginate(matched, page))
    }

    async fn approve(
        &self,
        id: Uuid,
        approved_by: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Attendance>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(attendance) = tables.attendance.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        attendance.approved_by = Some(approved_by);
        attendance.approved_at = Some(at);
        attendance.updated_at = Utc::now();
        Ok(Some(attendance.clone()))
    }
}

#[async_trait]
impl ReimbursementStore for MemoryStore {
    async fn insert(&self, reimbursement: NewReimbursement) -> StoreResult<Reimbursement> {
        let now = Utc::now();
        let created = Reimbursement {
            id: Uuid::new_v4(),
            employee_id: reimbursement.employee_id,
            amount: reimbursement.amount,
            description: reimbursement.description,
            receipts: reimbursement.receipts,
            status: ReimbursementStatus::Pending,
            approved_by: None,
            approved_at: None,
            paid_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .unwrap()
            .reimbursements
            .push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reimbursement>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.reimbursements.iter().find(|r| r.id == id).cloned())
    }

    async fn list(
        &self,
        filter: &ReimbursementFilter,
        page: PageRequest,
    ) -> StoreResult<(Vec<Reimbursement>, u64)> {
        let tables = self.tables.lock().unwrap();
        let matched = tables
            .reimbursements
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(paginate(matched, page))
    }

    async fn transition(
        &self,
        id: Uuid,
        transition: &ReimbursementTransition,
    ) -> StoreResult<Option<Reimbursement>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(reimbursement) = tables
            .reimbursements
            .iter_mut()
            .find(|r| r.id == id && r.status == transition.from)
        else {
            return Ok(None);
        };
        reimbursement.status = transition.to;
        if let Some(approved_by) = transition.approved_by {
            reimbursement.approved_by = Some(approved_by);
        }
        if transition.to == ReimbursementStatus::Paid {
            reimbursement.paid_at = Some(transition.at);
        } else {
            reimbursement.approved_at = Some(transition.at);
        }
        if let Some(reason) = &transition.rejection_reason {
            reimbursement.rejection_reason = Some(reason.clone());
        }
        reimbursement.updated_at = Utc::now();
        Ok(Some(reimbursement.clone()))
    }
}

#[async_trait]
impl AuditLogStore for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> StoreResult<()> {
        self.tables.lock().unwrap().audit_logs.push(entry);
        Ok(())
    }
}
