use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

/// 津贴或扣款明细，名称 -> 金额
pub type SalaryItems = BTreeMap<String, f64>;

/// 工资单
///
/// 每个员工每月最多一条；`gross_salary = basic_salary + Σ allowances`，
/// `net_salary = gross_salary - Σ deductions`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: SalaryItems,
    pub deductions: SalaryItems,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub currency: String,
    pub document_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayroll {
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: SalaryItems,
    pub deductions: SalaryItems,
    pub gross_salary: f64,
    pub net_salary: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub employee_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

impl PayrollFilter {
    pub fn matches(&self, payroll: &Payroll) -> bool {
        self.employee_id.is_none_or(|id| id == payroll.employee_id)
            && self.month.is_none_or(|m| m == payroll.month)
            && self.year.is_none_or(|y| y == payroll.year)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollView {
    #[serde(flatten)]
    pub payroll: Payroll,
    pub employee: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YtdSummary {
    pub year: i32,
    pub total_net: f64,
    pub total_gross: f64,
    pub months_count: usize,
}
