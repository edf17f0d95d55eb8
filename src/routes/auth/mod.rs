mod handler;
mod model;

pub use handler::{forgot_password, login, logout, refresh, reset_password};
