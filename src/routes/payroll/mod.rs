mod handler;
mod model;

pub use handler::{download_payroll, generate_payroll, get_payroll, list_payrolls, my_ytd, user_ytd};
