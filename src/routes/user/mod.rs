mod handler;
mod model;

pub use handler::{create_user, deactivate_user, get_user, list_users, me, update_user};
