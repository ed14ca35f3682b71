use serde::{Deserialize, Serialize};
use tarefas_atoms::tasks::Task;

pub const TASKS_SNAPSHOT: &str = "tasks_snapshot";

/// Incoming WebSocket message from client
#[derive(Debug, Deserialize)]
pub struct WebSocketMessage {
    pub action: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl WebSocketMessage {
    pub fn parsed_action(&self) -> Option<WebSocketAction> {
        serde_json::from_value(serde_json::Value::String(self.action.clone())).ok()
    }
}

/// WebSocket action types
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebSocketAction {
    /// Ask for the caller's current task list
    Subscribe,
}

/// Message pushed to connected clients
#[derive(Debug, Serialize)]
pub struct BroadcastMessage {
    pub r#type: String,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

impl BroadcastMessage {
    pub fn new(message_type: &str, data: serde_json::Value) -> Self {
        Self {
            r#type: message_type.to_string(),
            data,
        }
    }

    /// Full replacement of the owner's task list.
    pub fn tasks_snapshot(tasks: &[Task]) -> Self {
        Self::new(TASKS_SNAPSHOT, serde_json::json!({ "tasks": tasks }))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
