mod handler;
mod model;

pub use handler::{approve_timesheet, clock_in, clock_out, get_attendance, list_attendance};
