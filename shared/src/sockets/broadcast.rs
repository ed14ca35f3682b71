use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_apigatewaymanagement::error::DisplayErrorContext;
use aws_sdk_apigatewaymanagement::primitives::Blob;
use aws_sdk_apigatewaymanagement::Client as ApiGatewayClient;
use futures::future::join_all;

use super::connections::{owner_connections, remove_connection};
use super::messages::BroadcastMessage;
use tarefas_atoms::store::DocumentStore;
use tarefas_atoms::tasks;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The client hung up; the connection record is stale.
    #[error("connection {0} is gone")]
    Gone(String),

    #[error("failed to post to connection: {0}")]
    Failed(String),
}

/// Somewhere snapshots can be pushed to, keyed by connection id.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn post(&self, connection_id: &str, payload: &[u8]) -> Result<(), SinkError>;
}

/// Pushes to websocket clients through the API Gateway management API.
pub struct ApiGatewaySink {
    client: ApiGatewayClient,
}

impl ApiGatewaySink {
    /// `endpoint` is the stage URL, `https://{api-id}.execute-api.{region}.amazonaws.com/{stage}`.
    pub fn new(sdk_config: &SdkConfig, endpoint: &str) -> Self {
        let config = aws_sdk_apigatewaymanagement::config::Builder::from(sdk_config)
            .endpoint_url(endpoint)
            .build();
        Self {
            client: ApiGatewayClient::from_conf(config),
        }
    }
}

#[async_trait]
impl SnapshotSink for ApiGatewaySink {
    async fn post(&self, connection_id: &str, payload: &[u8]) -> Result<(), SinkError> {
        match self
            .client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(payload))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_gone_exception()).unwrap_or(false) {
                    Err(SinkError::Gone(connection_id.to_string()))
                } else {
                    Err(SinkError::Failed(DisplayErrorContext(&e).to_string()))
                }
            }
        }
    }
}

async fn snapshot_payload(store: &dyn DocumentStore, owner: &str) -> Option<Vec<u8>> {
    let tasks = match tasks::list_user_tasks(store, owner).await {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::error!("Failed to load tasks for snapshot: {}", e);
            return None;
        }
    };

    match BroadcastMessage::tasks_snapshot(&tasks).to_bytes() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!("Failed to serialize snapshot: {}", e);
            None
        }
    }
}

async fn post_or_forget(store: &dyn DocumentStore, sink: &dyn SnapshotSink, connection_id: &str, payload: &[u8]) {
    match sink.post(connection_id, payload).await {
        Ok(()) => {}
        Err(SinkError::Gone(id)) => {
            tracing::info!("Dropping stale connection {}", id);
            if let Err(e) = remove_connection(store, &id).await {
                tracing::warn!("Failed to remove connection {}: {}", id, e);
            }
        }
        Err(e) => tracing::warn!("{}", e),
    }
}

/// Push the owner's full, freshly read task list to each of their open
/// connections. Failures are logged and never reach the caller.
pub async fn publish_task_snapshot(store: &dyn DocumentStore, sink: &dyn SnapshotSink, owner: &str) {
    let connections = match owner_connections(store, owner).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Failed to list connections for {}: {}", owner, e);
            return;
        }
    };
    if connections.is_empty() {
        return;
    }

    let Some(payload) = snapshot_payload(store, owner).await else {
        return;
    };

    tracing::info!("Publishing task snapshot to {} connection(s)", connections.len());
    join_all(
        connections
            .iter()
            .map(|id| post_or_forget(store, sink, id, &payload)),
    )
    .await;
}

/// Send the owner's task list to a single connection, used right after subscribe.
pub async fn send_task_snapshot(
    store: &dyn DocumentStore,
    sink: &dyn SnapshotSink,
    owner: &str,
    connection_id: &str,
) {
    if let Some(payload) = snapshot_payload(store, owner).await {
        post_or_forget(store, sink, connection_id, &payload).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sockets::connections::register_connection;
    use std::collections::HashSet;
    use tarefas_atoms::store::MemoryStore;
    use tarefas_atoms::tasks::CreateTaskPayload;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        gone: HashSet<String>,
        sent: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl SnapshotSink for RecordingSink {
        async fn post(&self, connection_id: &str, payload: &[u8]) -> Result<(), SinkError> {
            if self.gone.contains(connection_id) {
                return Err(SinkError::Gone(connection_id.to_string()));
            }
            let value = serde_json::from_slice(payload).unwrap();
            self.sent.lock().await.push((connection_id.to_string(), value));
            Ok(())
        }
    }

    async fn add_task(store: &dyn DocumentStore, owner: &str, text: &str) {
        tasks::create_task(
            store,
            owner,
            CreateTaskPayload {
                task: text.to_string(),
                public: false,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_publish_reaches_only_owner_connections() {
        let store = MemoryStore::new();
        register_connection(&store, "mine", "a@x.com").await.unwrap();
        register_connection(&store, "theirs", "b@x.com").await.unwrap();
        add_task(&store, "a@x.com", "Ler livro").await;
        add_task(&store, "b@x.com", "Outra").await;

        let sink = RecordingSink::default();
        publish_task_snapshot(&store, &sink, "a@x.com").await;

        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "mine");
        assert_eq!(sent[0].1["type"], "tasks_snapshot");
        assert_eq!(sent[0].1["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(sent[0].1["tasks"][0]["task"], "Ler livro");
    }

    #[tokio::test]
    async fn test_gone_connection_is_removed() {
        let store = MemoryStore::new();
        register_connection(&store, "live", "a@x.com").await.unwrap();
        register_connection(&store, "stale", "a@x.com").await.unwrap();

        let sink = RecordingSink {
            gone: HashSet::from(["stale".to_string()]),
            ..Default::default()
        };
        publish_task_snapshot(&store, &sink, "a@x.com").await;

        assert_eq!(owner_connections(&store, "a@x.com").await.unwrap(), vec!["live".to_string()]);
        assert_eq!(sink.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_single_connection() {
        let store = MemoryStore::new();
        add_task(&store, "a@x.com", "Só esta").await;

        let sink = RecordingSink::default();
        send_task_snapshot(&store, &sink, "a@x.com", "c9").await;

        let sent = sink.sent.lock().await;
        assert_eq!(sent[0].0, "c9");
        assert_eq!(sent[0].1["tasks"][0]["task"], "Só esta");
    }
}
