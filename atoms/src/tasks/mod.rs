// Re-export model types and service functions
pub mod form;
pub mod http;
pub mod model;
pub mod service;
pub mod sync;

pub use form::{SubmitOutcome, TaskEntryForm};
pub use model::{CreateTaskPayload, Task, TASKS_COLLECTION};
pub use service::*;
pub use sync::TaskListSync;
