use serde_json::Value;

use tarefas_atoms::store::{now_timestamp, DocumentStore, Fields, Query, StoreError};

pub const CONNECTIONS_COLLECTION: &str = "connections";

/// Remember which signed-in user owns a websocket connection.
pub async fn register_connection(
    store: &dyn DocumentStore,
    connection_id: &str,
    owner: &str,
) -> Result<(), StoreError> {
    let mut fields = Fields::new();
    fields.insert("user".to_string(), Value::String(owner.to_string()));
    fields.insert("connected".to_string(), Value::String(now_timestamp()));

    store.set(CONNECTIONS_COLLECTION, connection_id, fields).await?;
    tracing::info!("Registered connection {} for {}", connection_id, owner);
    Ok(())
}

pub async fn remove_connection(store: &dyn DocumentStore, connection_id: &str) -> Result<(), StoreError> {
    store.delete(CONNECTIONS_COLLECTION, connection_id).await
}

pub async fn connection_owner(
    store: &dyn DocumentStore,
    connection_id: &str,
) -> Result<Option<String>, StoreError> {
    Ok(store
        .get(CONNECTIONS_COLLECTION, connection_id)
        .await?
        .and_then(|doc| doc.str_field("user").map(|s| s.to_string())))
}

/// Ids of every open connection belonging to `owner`.
pub async fn owner_connections(store: &dyn DocumentStore, owner: &str) -> Result<Vec<String>, StoreError> {
    let query = Query::collection(CONNECTIONS_COLLECTION).where_eq("user", owner);
    Ok(store.query(&query).await?.into_iter().map(|doc| doc.id).collect())
}
