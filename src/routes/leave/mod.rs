mod handler;
mod model;

pub use handler::{apply_leave, decide_leave, get_leave, list_leaves, my_balance, user_balance};
