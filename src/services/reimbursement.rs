//! 报销申请与处理
//!
//! 状态只能前进：Pending -> Approved -> Paid，或 Pending -> Rejected。
//! 每一步都是带原状态的条件更新，并发处理只有一个能成功。

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use uuid::Uuid;

use super::authorization::{self, PRIVILEGED};
use crate::AppState;
use crate::common::{PageRequest, PaginatedResponse};
use crate::error::{AppError, AppResult};
use crate::models::{
    NewReimbursement, Receipt, Reimbursement, ReimbursementFilter, ReimbursementStatus,
    ReimbursementTransition, ReimbursementView, User, UserSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReimbursementAction {
    Approve,
    Reject,
    Paid,
}

impl ReimbursementAction {
    /// 该动作要求的原状态和目标状态
    pub fn transition(self) -> (ReimbursementStatus, ReimbursementStatus) {
        match self {
            ReimbursementAction::Approve => {
                (ReimbursementStatus::Pending, ReimbursementStatus::Approved)
            }
            ReimbursementAction::Reject => {
                (ReimbursementStatus::Pending, ReimbursementStatus::Rejected)
            }
            ReimbursementAction::Paid => (ReimbursementStatus::Approved, ReimbursementStatus::Paid),
        }
    }
}

impl FromStr for ReimbursementAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReimbursementAction::Approve),
            "reject" => Ok(ReimbursementAction::Reject),
            "paid" => Ok(ReimbursementAction::Paid),
            _ => Err(AppError::Validation(
                "action must be approve, reject or paid".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub amount: f64,
    pub description: Option<String>,
    pub receipts: Vec<Receipt>,
}

fn valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

fn validate_receipts(receipts: Vec<Receipt>) -> AppResult<Vec<Receipt>> {
    receipts
        .into_iter()
        .map(|r| {
            let name = r.name.trim().to_string();
            let url = r.url.trim().to_string();
            if name.is_empty() || url.is_empty() {
                return Err(AppError::Validation(
                    "receipt name and url are required".to_string(),
                ));
            }
            if r.amount.is_some_and(|a| !valid_amount(a)) {
                return Err(AppError::Validation(
                    "receipt amount must be a non-negative number".to_string(),
                ));
            }
            Ok(Receipt {
                name,
                url,
                amount: r.amount,
            })
        })
        .collect()
}

async fn to_views(
    state: &AppState,
    records: Vec<Reimbursement>,
) -> AppResult<Vec<ReimbursementView>> {
    let mut ids: Vec<Uuid> = records
        .iter()
        .flat_map(|r| std::iter::once(r.employee_id).chain(r.approved_by))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = state
        .repos
        .users
        .find_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(records
        .into_iter()
        .map(|reimbursement| ReimbursementView {
            employee: users.get(&reimbursement.employee_id).cloned(),
            approver: reimbursement
                .approved_by
                .and_then(|id| users.get(&id).cloned()),
            reimbursement,
        })
        .collect())
}

async fn to_view(state: &AppState, reimbursement: Reimbursement) -> AppResult<ReimbursementView> {
    to_views(state, vec![reimbursement])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("reimbursement view missing".to_string()))
}

pub async fn submit(
    state: &AppState,
    actor: &User,
    submission: Submission,
) -> AppResult<ReimbursementView> {
    if !valid_amount(submission.amount) {
        return Err(AppError::Validation(
            "amount must be a non-negative number".to_string(),
        ));
    }
    let receipts = validate_receipts(submission.receipts)?;

    let reimbursement = state
        .repos
        .reimbursements
        .insert(NewReimbursement {
            employee_id: actor.id,
            amount: submission.amount,
            description: submission
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            receipts,
        })
        .await?;

    tracing::info!(reimbursement_id = %reimbursement.id, employee_id = %actor.id, amount = reimbursement.amount, "Reimbursement submitted");
    to_view(state, reimbursement).await
}

pub async fn list(
    state: &AppState,
    actor: &User,
    requested: ReimbursementFilter,
    page: PageRequest,
) -> AppResult<PaginatedResponse<ReimbursementView>> {
    let filter = ReimbursementFilter {
        employee_id: authorization::scope_employee(actor, requested.employee_id),
        ..requested
    };
    let (records, total) = state.repos.reimbursements.list(&filter, page).await?;
    Ok(PaginatedResponse::new(
        to_views(state, records).await?,
        total,
        page,
    ))
}

pub async fn get(state: &AppState, actor: &User, id: Uuid) -> AppResult<ReimbursementView> {
    let reimbursement = state
        .repos
        .reimbursements
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Reimbursement"))?;
    authorization::ensure_self_or_roles(actor, reimbursement.employee_id, PRIVILEGED)?;
    to_view(state, reimbursement).await
}

/// 审批、驳回或标记已付款
pub async fn act(
    state: &AppState,
    actor: &User,
    id: Uuid,
    action: ReimbursementAction,
    rejection_reason: Option<String>,
) -> AppResult<ReimbursementView> {
    authorization::require_role(actor, PRIVILEGED)?;

    let current = state
        .repos
        .reimbursements
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Reimbursement"))?;

    let (from, to) = action.transition();
    if current.status != from {
        if action == ReimbursementAction::Paid && current.status == ReimbursementStatus::Pending {
            return Err(AppError::Validation(
                "Reimbursement must be approved before it is paid".to_string(),
            ));
        }
        return Err(AppError::AlreadyProcessed);
    }

    let transition = ReimbursementTransition {
        from,
        to,
        approved_by: (action != ReimbursementAction::Paid).then_some(actor.id),
        at: Utc::now(),
        rejection_reason: match action {
            ReimbursementAction::Reject => rejection_reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            _ => None,
        },
    };

    let updated = state
        .repos
        .reimbursements
        .transition(id, &transition)
        .await?
        .ok_or(AppError::AlreadyProcessed)?;

    tracing::info!(reimbursement_id = %updated.id, status = %updated.status, actor = %actor.id, "Reimbursement processed");
    to_view(state, updated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::TestApp;

    fn submission(amount: f64) -> Submission {
        Submission {
            amount,
            description: Some("Client dinner".into()),
            receipts: vec![Receipt {
                name: "bill.jpg".into(),
                url: "https://files.company.com/bill.jpg".into(),
                amount: Some(amount),
            }],
        }
    }

    #[test]
    fn action_names() {
        assert_eq!("paid".parse::<ReimbursementAction>().unwrap(), ReimbursementAction::Paid);
        assert!(matches!(
            "refund".parse::<ReimbursementAction>(),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn submit_validates_amounts() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;

        let view = submit(&app.state, &john, submission(1250.5)).await.unwrap();
        assert_eq!(view.reimbursement.status, ReimbursementStatus::Pending);
        assert_eq!(view.reimbursement.employee_id, john.id);
        assert_eq!(view.reimbursement.receipts.len(), 1);

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                submit(&app.state, &john, submission(bad)).await,
                Err(AppError::Validation(_))
            ));
        }

        let mut no_url = submission(10.0);
        no_url.receipts[0].url = " ".into();
        assert!(matches!(
            submit(&app.state, &john, no_url).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn approve_then_pay() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;
        let admin = app.user("admin@company.com", Role::Admin).await;
        let claim = submit(&app.state, &john, submission(300.0)).await.unwrap();
        let id = claim.reimbursement.id;

        assert!(matches!(
            act(&app.state, &hr, id, ReimbursementAction::Paid, None).await,
            Err(AppError::Validation(_))
        ));

        let approved = act(&app.state, &hr, id, ReimbursementAction::Approve, None)
            .await
            .unwrap();
        assert_eq!(approved.reimbursement.status, ReimbursementStatus::Approved);
        assert_eq!(approved.approver.unwrap().id, hr.id);

        let paid = act(&app.state, &admin, id, ReimbursementAction::Paid, None)
            .await
            .unwrap();
        assert_eq!(paid.reimbursement.status, ReimbursementStatus::Paid);
        assert!(paid.reimbursement.paid_at.is_some());
        // 付款不改审批人
        assert_eq!(paid.reimbursement.approved_by, Some(hr.id));

        assert!(matches!(
            act(&app.state, &admin, id, ReimbursementAction::Paid, None).await,
            Err(AppError::AlreadyProcessed)
        ));
    }

    #[tokio::test]
    async fn rejection_is_final() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;
        let claim = submit(&app.state, &john, submission(80.0)).await.unwrap();
        let id = claim.reimbursement.id;

        assert!(matches!(
            act(&app.state, &john, id, ReimbursementAction::Approve, None).await,
            Err(AppError::InsufficientPermissions)
        ));

        let rejected = act(
            &app.state,
            &hr,
            id,
            ReimbursementAction::Reject,
            Some(" No receipt ".into()),
        )
        .await
        .unwrap();
        assert_eq!(rejected.reimbursement.status, ReimbursementStatus::Rejected);
        assert_eq!(rejected.reimbursement.rejection_reason.as_deref(), Some("No receipt"));

        for action in [
            ReimbursementAction::Approve,
            ReimbursementAction::Reject,
            ReimbursementAction::Paid,
        ] {
            assert!(matches!(
                act(&app.state, &hr, id, action, None).await,
                Err(AppError::AlreadyProcessed)
            ));
        }
        assert!(matches!(
            act(&app.state, &hr, Uuid::new_v4(), ReimbursementAction::Approve, None).await,
            Err(AppError::NotFound("Reimbursement"))
        ));
    }

    #[tokio::test]
    async fn listing_and_detail_are_scoped() {
        let app = TestApp::new();
        let john = app.user("john@company.com", Role::Employee).await;
        let jane = app.user("jane@company.com", Role::Employee).await;
        let hr = app.user("hr@company.com", Role::Manager).await;
        let johns = submit(&app.state, &john, submission(10.0)).await.unwrap();
        let janes = submit(&app.state, &jane, submission(20.0)).await.unwrap();
        act(&app.state, &hr, janes.reimbursement.id, ReimbursementAction::Approve, None)
            .await
            .unwrap();
        let page = PageRequest { page: 1, limit: 20 };

        let sneaky = ReimbursementFilter {
            employee_id: Some(jane.id),
            status: None,
        };
        let own = list(&app.state, &john, sneaky, page).await.unwrap();
        assert_eq!(own.pagination.total, 1);
        assert_eq!(own.items[0].reimbursement.employee_id, john.id);

        let approved = ReimbursementFilter {
            employee_id: None,
            status: Some(ReimbursementStatus::Approved),
        };
        let all_approved = list(&app.state, &hr, approved, page).await.unwrap();
        assert_eq!(all_approved.pagination.total, 1);
        assert_eq!(all_approved.items[0].reimbursement.id, janes.reimbursement.id);

        assert!(matches!(
            get(&app.state, &jane, johns.reimbursement.id).await,
            Err(AppError::InsufficientPermissions)
        ));
        assert!(get(&app.state, &john, johns.reimbursement.id).await.is_ok());
    }
}
