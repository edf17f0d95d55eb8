mod handler;
mod model;

pub use handler::{act_on_reimbursement, get_reimbursement, list_reimbursements, submit_reimbursement};
