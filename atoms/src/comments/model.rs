use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Fields};

pub const COMMENTS_COLLECTION: &str = "comments";

/// A text reply attached to exactly one task
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub comment: String,

    /// Parent task; the store does not check that it exists
    #[serde(rename = "taskId")]
    pub task_id: String,

    /// Author email
    pub user: String,

    /// Author display name
    pub name: String,

    #[serde(default)]
    pub created: String,
}

impl Comment {
    pub fn from_document(doc: &Document) -> Self {
        Comment {
            id: doc.id.clone(),
            comment: doc.str_field("comment").map(|s| s.to_string()).unwrap_or_default(),
            task_id: doc.str_field("taskId").map(|s| s.to_string()).unwrap_or_default(),
            user: doc.str_field("user").map(|s| s.to_string()).unwrap_or_default(),
            name: doc.str_field("name").map(|s| s.to_string()).unwrap_or_default(),
            created: doc.str_field("created").map(|s| s.to_string()).unwrap_or_default(),
        }
    }

    pub fn is_authored_by(&self, email: &str) -> bool {
        !email.is_empty() && self.user == email
    }
}

pub(crate) fn comment_fields(task_id: &str, text: &str, email: &str, name: &str, created: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("comment".to_string(), Value::String(text.to_string()));
    fields.insert("created".to_string(), Value::String(created.to_string()));
    fields.insert("user".to_string(), Value::String(email.to_string()));
    fields.insert("name".to_string(), Value::String(name.to_string()));
    fields.insert("taskId".to_string(), Value::String(task_id.to_string()));
    fields
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentPayload {
    pub comment: String,
}
