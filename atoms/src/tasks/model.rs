use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Fields};

pub const TASKS_COLLECTION: &str = "tarefas";

/// Task domain model - a user-owned note with a visibility flag
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    pub id: String,

    /// Stored as "tarefa" in the document
    pub task: String,

    /// RFC 3339 creation time
    pub created: String,

    /// Owner email
    pub user: String,

    pub public: bool,
}

impl Task {
    /// Map a store document to the view model. Missing fields fall back to
    /// empty values rather than failing the whole list.
    pub fn from_document(doc: &Document) -> Self {
        Task {
            id: doc.id.clone(),
            task: doc.str_field("tarefa").map(|s| s.to_string()).unwrap_or_default(),
            created: doc.str_field("created").map(|s| s.to_string()).unwrap_or_default(),
            user: doc.str_field("user").map(|s| s.to_string()).unwrap_or_default(),
            public: doc.bool_field("public").unwrap_or(false),
        }
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        !email.is_empty() && self.user == email
    }
}

pub(crate) fn task_fields(owner: &str, text: &str, public: bool, created: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("tarefa".to_string(), Value::String(text.to_string()));
    fields.insert("created".to_string(), Value::String(created.to_string()));
    fields.insert("user".to_string(), Value::String(owner.to_string()));
    fields.insert("public".to_string(), Value::Bool(public));
    fields
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskPayload {
    pub task: String,
    #[serde(default)]
    pub public: bool,
}
