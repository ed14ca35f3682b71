use super::model::{CreateTaskPayload, Task};
use super::service;
use crate::store::DocumentStore;

/// What happened to a submitted draft.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Task),
    /// Empty input, nothing was written.
    Ignored,
    /// The store rejected the write. Already logged; the draft is kept.
    NotSaved,
}

/// Draft state of the task entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEntryForm {
    pub input: String,
    pub public: bool,
}

impl TaskEntryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft(input: impl Into<String>, public: bool) -> Self {
        Self {
            input: input.into(),
            public,
        }
    }

    /// Persist the draft as a task owned by `owner`, then reset the form.
    pub async fn submit(&mut self, store: &dyn DocumentStore, owner: &str) -> SubmitOutcome {
        if self.input.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let payload = CreateTaskPayload {
            task: self.input.clone(),
            public: self.public,
        };

        match service::create_task(store, owner, payload).await {
            Ok(Some(task)) => {
                self.input.clear();
                self.public = false;
                SubmitOutcome::Created(task)
            }
            Ok(None) => SubmitOutcome::Ignored,
            Err(e) => {
                tracing::error!("Failed to save task: {}", e);
                SubmitOutcome::NotSaved
            }
        }
    }
}
