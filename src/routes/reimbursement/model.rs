use serde::Deserialize;
use uuid::Uuid;

use crate::common::PageQuery;
use crate::models::Receipt;
use crate::services::reimbursement::Submission;

#[derive(Debug, Deserialize)]
pub struct SubmitReimbursementRequest {
    pub amount: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub receipts: Vec<Receipt>,
}

impl From<SubmitReimbursementRequest> for Submission {
    fn from(req: SubmitReimbursementRequest) -> Self {
        Self {
            amount: req.amount,
            description: req.description,
            receipts: req.receipts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReimbursementListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub employee: Option<Uuid>,
    pub status: Option<String>,
}

impl ReimbursementListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementActionRequest {
    #[serde(default)]
    pub action: String,
    pub rejection_reason: Option<String>,
}
