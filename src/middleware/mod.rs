mod auth;
mod client_meta;
mod error_handler;
mod rate_limit;

pub use auth::{CurrentUser, auth_middleware};
pub use client_meta::{Client, client_ip};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
