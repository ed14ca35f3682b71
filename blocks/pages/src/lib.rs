//! Page composition over the task and comment atoms.

pub mod dashboard;
pub mod header;
pub mod task_page;
pub mod types;

pub use types::{Page, Redirect, HOME_ROUTE};
