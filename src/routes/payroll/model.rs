use serde::Deserialize;
use uuid::Uuid;

use crate::common::PageQuery;
use crate::error::AppError;
use crate::models::SalaryItems;
use crate::services::payroll::PayrollRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayrollRequest {
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub basic_salary: Option<f64>,
    #[serde(default)]
    pub allowances: SalaryItems,
    #[serde(default)]
    pub deductions: SalaryItems,
}

impl TryFrom<GeneratePayrollRequest> for PayrollRequest {
    type Error = AppError;

    fn try_from(req: GeneratePayrollRequest) -> Result<Self, Self::Error> {
        let basic_salary = req
            .basic_salary
            .ok_or_else(|| AppError::Validation("basicSalary is required".to_string()))?;
        Ok(Self {
            employee_id: req.employee_id,
            month: req.month,
            year: req.year,
            basic_salary,
            allowances: req.allowances,
            deductions: req.deductions,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PayrollListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub employee: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

impl PayrollListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct YtdQuery {
    pub year: Option<i32>,
}
